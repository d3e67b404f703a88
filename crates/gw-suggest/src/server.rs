//! Line-delimited JSON transport over TCP.
//!
//! Every request is one JSON object on its own line, tagged by `op`; every
//! response is one JSON object on its own line, tagged by `status`.

use std::sync::Arc;

use gw_store::{ParameterSpaceProvider, StateStore, SuggestionParameter, TrialSink};
use gw_types::{GwError, GwResult, SuggestionKey, Trial};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::service::{GetSuggestionsRequest, GridSuggestService};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ServiceRequest {
    GetSuggestions(GetSuggestionsRequest),
    SetSuggestionParameters {
        study_id: String,
        param_set_id: String,
        parameters: Vec<SuggestionParameter>,
    },
    Progress {
        study_id: String,
        param_set_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ServiceResponse {
    Ok {
        result: serde_json::Value,
    },
    Error {
        message: String,
        retryable: bool,
        /// Trials that were created before the call failed.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        created: Vec<Trial>,
    },
}

impl ServiceResponse {
    fn from_error(err: GwError) -> Self {
        let retryable = err.is_retryable();
        let message = err.to_string();
        let created = match err {
            GwError::TrialCreation(partial) => partial.created,
            _ => Vec::new(),
        };
        Self::Error {
            message,
            retryable,
            created,
        }
    }
}

/// Decode and execute one request line.
pub async fn handle_line<P, S, T>(service: &GridSuggestService<P, S, T>, line: &str) -> ServiceResponse
where
    P: ParameterSpaceProvider,
    S: StateStore,
    T: TrialSink,
{
    match dispatch(service, line).await {
        Ok(result) => ServiceResponse::Ok { result },
        Err(e) => ServiceResponse::from_error(e),
    }
}

async fn dispatch<P, S, T>(service: &GridSuggestService<P, S, T>, line: &str) -> GwResult<serde_json::Value>
where
    P: ParameterSpaceProvider,
    S: StateStore,
    T: TrialSink,
{
    let request: ServiceRequest = serde_json::from_str(line)?;
    let result = match request {
        ServiceRequest::GetSuggestions(request) => {
            serde_json::to_value(service.get_suggestions(&request).await?)?
        }
        ServiceRequest::SetSuggestionParameters {
            study_id,
            param_set_id,
            parameters,
        } => {
            let key = SuggestionKey::new(study_id, param_set_id);
            serde_json::to_value(service.set_suggestion_parameters(&key, parameters).await?)?
        }
        ServiceRequest::Progress {
            study_id,
            param_set_id,
        } => {
            let key = SuggestionKey::new(study_id, param_set_id);
            serde_json::to_value(service.progress(&key).await?)?
        }
    };
    Ok(result)
}

/// Accept connections forever, serving each on its own task.
pub async fn serve<P, S, T>(listener: TcpListener, service: Arc<GridSuggestService<P, S, T>>) -> GwResult<()>
where
    P: ParameterSpaceProvider + 'static,
    S: StateStore + 'static,
    T: TrialSink + 'static,
{
    loop {
        let (socket, peer) = listener.accept().await?;
        debug!(peer = %peer, "connection accepted");

        let service = Arc::clone(&service);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, &*service).await {
                error!(peer = %peer, error = %e, "connection failed");
            }
        });
    }
}

async fn handle_connection<P, S, T>(socket: TcpStream, service: &GridSuggestService<P, S, T>) -> GwResult<()>
where
    P: ParameterSpaceProvider,
    S: StateStore,
    T: TrialSink,
{
    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(service, &line).await;
        let mut payload = serde_json::to_vec(&response)?;
        payload.push(b'\n');
        writer.write_all(&payload).await?;
    }

    info!("connection closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_store::{MemoryStateStore, MemoryStudyProvider, MemoryTrialSink};
    use gw_types::{ParameterConfig, StudyConfig};

    fn service() -> GridSuggestService<MemoryStudyProvider, MemoryStateStore, MemoryTrialSink> {
        let provider = MemoryStudyProvider::new();
        provider.insert(
            "s1",
            StudyConfig::new("cifar")
                .with_parameter(ParameterConfig::real("lr", 0.0, 1.0))
                .with_parameter(ParameterConfig::categorical("opt", ["sgd", "adam", "rmsprop"])),
        );
        GridSuggestService::new(provider, MemoryStateStore::new(), MemoryTrialSink::new())
    }

    fn result(response: ServiceResponse) -> serde_json::Value {
        match response {
            ServiceResponse::Ok { result } => result,
            other => panic!("expected ok response, got {other:?}"),
        }
    }

    #[test]
    fn test_request_wire_format() {
        let request: ServiceRequest = serde_json::from_str(
            r#"{"op": "get_suggestions", "study_id": "s1", "param_set_id": "p1", "request_number": 3}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            ServiceRequest::GetSuggestions(GetSuggestionsRequest::new("s1", "p1", 3))
        );

        // request_number defaults to the rest of the grid.
        let request: ServiceRequest = serde_json::from_str(
            r#"{"op": "get_suggestions", "study_id": "s1", "param_set_id": "p1"}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            ServiceRequest::GetSuggestions(GetSuggestionsRequest::new("s1", "p1", 0))
        );
    }

    #[tokio::test]
    async fn test_handle_line_round() {
        let service = service();

        let set = handle_line(
            &service,
            r#"{"op": "set_suggestion_parameters", "study_id": "s1", "param_set_id": "p1",
                "parameters": [{"name": "DefaultGrid", "value": "3"}, {"name": "opt", "value": "2"}]}"#,
        )
        .await;
        assert_eq!(result(set)["grid"]["default_resolution"], 3);

        let reply = result(
            handle_line(
                &service,
                r#"{"op": "get_suggestions", "study_id": "s1", "param_set_id": "p1", "request_number": 2}"#,
            )
            .await,
        );
        let trials = reply["trials"].as_array().unwrap();
        assert_eq!(trials.len(), 2);
        let first = &trials[0]["parameter_set"]["parameters"];
        assert_eq!(first[0]["value"], "0.0000");
        assert_eq!(first[1]["value"], "sgd");
        assert_eq!(trials[1]["parameter_set"]["parameters"][1]["value"], "rmsprop");

        let progress = result(
            handle_line(&service, r#"{"op": "progress", "study_id": "s1", "param_set_id": "p1"}"#).await,
        );
        assert_eq!(progress["cursor"], 2);
        assert_eq!(progress["total"], 6);
        assert_eq!(progress["phase"], "in_progress");
    }

    #[tokio::test]
    async fn test_errors_are_reported() {
        let service = service();

        match handle_line(&service, "{not json").await {
            ServiceResponse::Error { message, retryable, .. } => {
                assert!(message.contains("Serialization"));
                assert!(!retryable);
            }
            other => panic!("expected error, got {other:?}"),
        }

        match handle_line(
            &service,
            r#"{"op": "get_suggestions", "study_id": "nope", "param_set_id": "p1"}"#,
        )
        .await
        {
            ServiceResponse::Error { message, .. } => assert!(message.contains("Study not found")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_partial_failure_returns_created_trials() {
        let service = service();
        service
            .set_suggestion_parameters(
                &SuggestionKey::new("s1", "p1"),
                vec![SuggestionParameter::new("DefaultGrid", "2")],
            )
            .await
            .unwrap();
        service.sink().fail_on_index(1);

        match handle_line(
            &service,
            r#"{"op": "get_suggestions", "study_id": "s1", "param_set_id": "p1", "request_number": 4}"#,
        )
        .await
        {
            ServiceResponse::Error { created, .. } => {
                assert_eq!(created.len(), 1);
                assert_eq!(created[0].parameter_set.index, 0);
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_serve_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(listener, Arc::new(service())));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        writer
            .write_all(b"{\"op\": \"get_suggestions\", \"study_id\": \"s1\", \"param_set_id\": \"p1\"}\n")
            .await
            .unwrap();

        let mut lines = BufReader::new(reader).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let response: ServiceResponse = serde_json::from_str(&line).unwrap();
        let reply = result(response);
        assert_eq!(reply["trials"].as_array().unwrap().len(), 1);

        server.abort();
    }
}
