//! The export run: authenticate, query, page, filter, write.

use std::sync::Arc;

use tracing::{debug, info};

use crate::auth::{AccessToken, ClientSecretCredential};
use crate::config::Config;
use crate::error::AppError;
use crate::graph::{GraphClient, UserDirectory, UserPager, UserQuery};
use crate::report::{Clock, CsvSink, OutputRow, StaleUserFilter, SystemClock};

/// Authenticated Graph access for one run.
pub struct GraphSession {
    credential: Arc<ClientSecretCredential>,
    client: GraphClient,
    scopes: Vec<String>,
}

impl GraphSession {
    pub fn client(&self) -> &GraphClient {
        &self.client
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub users_scanned: usize,
    pub pages_fetched: usize,
    pub rows_written: usize,
}

/// Build the credential and the Graph client. No network traffic.
pub fn initialize_graph_for_app_auth(config: &Config) -> Result<GraphSession, AppError> {
    let credential = ClientSecretCredential::new(&config.credential, &config.api.authority_host)
        .map_err(AppError::Credential)?;
    let credential = Arc::new(credential);
    let scopes = vec![config.api.scope.clone()];

    let client = GraphClient::new(
        Arc::clone(&credential),
        scopes.clone(),
        &config.api.graph_base_url,
    )
    .map_err(AppError::Adapter)?;

    debug!("Graph client initialized for {:?}", credential);

    Ok(GraphSession {
        credential,
        client,
        scopes,
    })
}

/// Return a currently valid app-only token for the session's scope.
pub async fn get_app_token(session: &GraphSession) -> Result<AccessToken, AppError> {
    let scopes: Vec<&str> = session.scopes.iter().map(String::as_str).collect();
    session
        .credential
        .get_token(&scopes)
        .await
        .map_err(AppError::Token)
}

/// Rows collected from a directory, with paging statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collected {
    pub rows: Vec<OutputRow>,
    pub users_scanned: usize,
    pub pages_fetched: usize,
}

/// List every user in display-name order and keep the stale ones.
///
/// Any failure aborts the scan; rows gathered so far are dropped.
pub async fn collect_stale_users<D, C>(
    directory: &D,
    filter: &StaleUserFilter<C>,
) -> Result<Collected, AppError>
where
    D: UserDirectory + ?Sized,
    C: Clock,
{
    let first_page = directory
        .list_users(&UserQuery::stale_users())
        .await
        .map_err(AppError::Query)?;

    let mut pager = UserPager::new(directory, first_page);
    let mut rows = Vec::new();
    let mut users_scanned = 0;

    while let Some(user) = pager.next_user().await.map_err(AppError::PageIteration)? {
        users_scanned += 1;
        if let Some(row) = filter.evaluate(&user) {
            rows.push(row);
        }
    }

    info!(
        "Scanned {} users across {} pages, {} stale",
        users_scanned,
        pager.pages_fetched(),
        rows.len()
    );

    Ok(Collected {
        rows,
        users_scanned,
        pages_fetched: pager.pages_fetched(),
    })
}

/// Run the export against the wall clock.
pub async fn run(config: &Config) -> Result<RunSummary, AppError> {
    run_with_clock(config, SystemClock).await
}

/// Run the export with an explicit clock.
pub async fn run_with_clock<C: Clock>(config: &Config, clock: C) -> Result<RunSummary, AppError> {
    let session = initialize_graph_for_app_auth(config)?;

    let token = get_app_token(&session).await?;
    info!("App-only token valid until {}", token.expires_at());

    // Fail on an unwritable path before any users are fetched.
    let sink = CsvSink::create(&config.report.output_path)?;

    let filter = StaleUserFilter::new(&config.report, clock);
    let collected = collect_stale_users(session.client(), &filter).await?;

    let rows_written = sink.write_all(&collected.rows)?;

    Ok(RunSummary {
        users_scanned: collected.users_scanned,
        pages_fetched: collected.pages_fetched,
        rows_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, CredentialConfig, ReportConfig};
    use crate::error::{ApiError, AuthError, ExportError};
    use crate::graph::pager::tests::FakeDirectory;
    use crate::graph::{SignInActivity, User};
    use crate::report::{FixedClock, NO_SIGN_IN};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use httpmock::prelude::*;
    use std::path::Path;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn filter() -> StaleUserFilter<FixedClock> {
        StaleUserFilter::new(&ReportConfig::default(), FixedClock(now()))
    }

    fn user(name: &str, mail: &str, last_sign_in: Option<DateTime<Utc>>) -> User {
        User {
            id: name.to_lowercase(),
            display_name: Some(name.to_string()),
            mail: Some(mail.to_string()),
            sign_in_activity: last_sign_in.map(|at| SignInActivity {
                last_sign_in_date_time: Some(at),
            }),
        }
    }

    fn mixed_users() -> Vec<User> {
        vec![
            user("Alice", "alice@acu.edu", Some(now() - Duration::days(200))),
            user("Bob", "bob@other.edu", Some(now() - Duration::days(5))),
            user("Carol", "carol@acu.edu", None),
            user("Dan", "dan@acu.edu", Some(now() - Duration::days(3))),
            user("Eve", "eve@acu.edu", Some(now() - Duration::days(400))),
        ]
    }

    fn test_config(server: &MockServer, output: &Path) -> Config {
        Config {
            credential: CredentialConfig {
                tenant_id: "tenant".into(),
                client_id: "client".into(),
                client_secret: "secret".into(),
            },
            api: ApiConfig {
                graph_base_url: format!("{}/v1.0", server.base_url()),
                authority_host: server.base_url(),
                ..ApiConfig::default()
            },
            report: ReportConfig {
                output_path: output.to_path_buf(),
                ..ReportConfig::default()
            },
        }
    }

    #[tokio::test]
    async fn test_alice_bob_carol() {
        let users = vec![
            user("Alice", "alice@acu.edu", Some(now() - Duration::days(200))),
            user("Bob", "bob@other.edu", Some(now() - Duration::days(5))),
            user("Carol", "carol@acu.edu", None),
        ];
        let directory = FakeDirectory::paged(users, &[3]);

        let collected = collect_stale_users(&directory, &filter()).await.unwrap();

        let expected_alice = (now() - Duration::days(200)).to_string();
        let rows: Vec<(&str, &str, &str)> = collected
            .rows
            .iter()
            .map(|r| (r.display_name.as_str(), r.mail.as_str(), r.status.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Alice", "alice@acu.edu", expected_alice.as_str()),
                ("Carol", "carol@acu.edu", NO_SIGN_IN),
            ]
        );
        assert_eq!(collected.users_scanned, 3);
    }

    #[tokio::test]
    async fn test_paging_matches_single_page() {
        let single = FakeDirectory::paged(mixed_users(), &[5]);
        let paged = FakeDirectory::paged(mixed_users(), &[2, 2, 1]);

        let from_single = collect_stale_users(&single, &filter()).await.unwrap();
        let from_paged = collect_stale_users(&paged, &filter()).await.unwrap();

        assert_eq!(from_single.rows, from_paged.rows);
        assert_eq!(from_single.pages_fetched, 1);
        assert_eq!(from_paged.pages_fetched, 3);
        assert_eq!(
            from_paged
                .rows
                .iter()
                .map(|r| r.display_name.as_str())
                .collect::<Vec<_>>(),
            vec!["Alice", "Carol", "Eve"]
        );
    }

    #[tokio::test]
    async fn test_page_failure_aborts() {
        let directory = FakeDirectory::paged(mixed_users(), &[2, 2, 1]).failing_at("link-2");

        let err = collect_stale_users(&directory, &filter()).await.unwrap_err();
        assert!(matches!(err, AppError::PageIteration(_)));
    }

    #[tokio::test]
    async fn test_same_data_gives_identical_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut outputs = Vec::new();

        for name in ["first.csv", "second.csv"] {
            let path = dir.path().join(name);
            let directory = FakeDirectory::paged(mixed_users(), &[2, 2, 1]);
            let collected = collect_stale_users(&directory, &filter()).await.unwrap();
            CsvSink::create(&path)
                .unwrap()
                .write_all(&collected.rows)
                .unwrap();
            outputs.push(std::fs::read(&path).unwrap());
        }

        assert!(!outputs[0].is_empty());
        assert_eq!(outputs[0], outputs[1]);
    }

    #[test]
    fn test_initialize_rejects_bad_tenant() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start();
        let mut config = test_config(&server, &dir.path().join("out.csv"));
        config.credential.tenant_id = "bad tenant".into();

        let result = initialize_graph_for_app_auth(&config);
        assert!(matches!(
            result,
            Err(AppError::Credential(AuthError::InvalidCredential(_)))
        ));
    }

    #[test]
    fn test_initialize_rejects_bad_graph_url() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start();
        let mut config = test_config(&server, &dir.path().join("out.csv"));
        config.api.graph_base_url = "::not-a-url".into();

        let result = initialize_graph_for_app_auth(&config);
        assert!(matches!(result, Err(AppError::Adapter(_))));
    }

    #[tokio::test]
    async fn test_end_to_end_against_mock_graph() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("stale_users_SAML.csv");

        let token_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/tenant/oauth2/v2.0/token")
                .body_includes("grant_type=client_credentials");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"token_type":"Bearer","expires_in":3600,"access_token":"e2e-tok"}"#);
        });

        let next_link = format!("{}/v1.0/users?$skiptoken=page2", server.base_url());
        let first_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1.0/users")
                .query_param("$orderby", "displayName")
                .header("authorization", "Bearer e2e-tok");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "@odata.nextLink": next_link,
                    "value": [
                        {
                            "displayName": "Alice",
                            "id": "1",
                            "mail": "alice@acu.edu",
                            "signInActivity": { "lastSignInDateTime": "2023-11-14T08:30:05Z" }
                        },
                        {
                            "displayName": "Bob",
                            "id": "2",
                            "mail": "bob@other.edu",
                            "signInActivity": { "lastSignInDateTime": "2023-01-01T00:00:00Z" }
                        }
                    ]
                }));
        });
        let second_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1.0/users")
                .query_param("$skiptoken", "page2")
                .header("authorization", "Bearer e2e-tok");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "value": [
                        { "displayName": "Carol", "id": "3", "mail": "carol@acu.edu" },
                        {
                            "displayName": "Dan",
                            "id": "4",
                            "mail": "dan@acu.edu",
                            "signInActivity": { "lastSignInDateTime": "2024-05-30T10:00:00Z" }
                        },
                        { "displayName": "Nomail", "id": "5", "mail": null }
                    ]
                }));
        });

        let config = test_config(&server, &output);
        let summary = run_with_clock(&config, FixedClock(now())).await.unwrap();

        assert_eq!(
            summary,
            RunSummary {
                users_scanned: 5,
                pages_fetched: 2,
                rows_written: 2,
            }
        );
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "Alice,alice@acu.edu,2023-11-14 08:30:05 UTC\n\
             Carol,carol@acu.edu,NO SIGN IN OR LAST SIGN IN BEFORE April 2020\n"
        );
        token_mock.assert_calls(1);
        first_mock.assert_calls(1);
        second_mock.assert_calls(1);
    }

    #[tokio::test]
    async fn test_unwritable_output_fails_before_query() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("missing").join("out.csv");

        server.mock(|when, then| {
            when.method(POST).path("/tenant/oauth2/v2.0/token");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"token_type":"Bearer","expires_in":3600,"access_token":"tok"}"#);
        });
        let users_mock = server.mock(|when, then| {
            when.method(GET).path("/v1.0/users");
            then.status(200).json_body(serde_json::json!({ "value": [] }));
        });

        let config = test_config(&server, &output);
        let err = run_with_clock(&config, FixedClock(now())).await.unwrap_err();

        assert!(matches!(err, AppError::Export(ExportError::Create { .. })));
        users_mock.assert_calls(0);
    }

    #[tokio::test]
    async fn test_query_failure_leaves_empty_file() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        std::fs::write(&output, "stale,previous,run\n").unwrap();

        server.mock(|when, then| {
            when.method(POST).path("/tenant/oauth2/v2.0/token");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"token_type":"Bearer","expires_in":3600,"access_token":"tok"}"#);
        });
        server.mock(|when, then| {
            when.method(GET).path("/v1.0/users");
            then.status(403).body("{}");
        });

        let config = test_config(&server, &output);
        let err = run_with_clock(&config, FixedClock(now())).await.unwrap_err();

        assert!(matches!(err, AppError::Query(ApiError::Forbidden)));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
    }

    #[tokio::test]
    async fn test_token_rejection_is_fatal() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();

        server.mock(|when, then| {
            when.method(POST).path("/tenant/oauth2/v2.0/token");
            then.status(401)
                .header("content-type", "application/json")
                .body(r#"{"error":"invalid_client"}"#);
        });

        let config = test_config(&server, &dir.path().join("out.csv"));
        let err = run_with_clock(&config, FixedClock(now())).await.unwrap_err();

        assert!(matches!(err, AppError::Token(AuthError::TokenRequestFailed(_))));
        assert!(!dir.path().join("out.csv").exists());
    }
}
