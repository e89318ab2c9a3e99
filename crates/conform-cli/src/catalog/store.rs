//! `store` area: authenticated writes against the key/value store
//!
//! When `require-auth` is on (the default), the value checks only make sense
//! once anonymous writes are known to be refused, so they depend on that
//! check as well as on the writer login.

use super::service::DEFAULT_CAPACITY;
use super::{Exchange, FakeService, Request, STORE};
use conform_config::RunConfig;
use conform_engine::{Failure, Test, TestContext, TestRef, TestResult};
use serde_json::json;
use std::sync::Arc;

const DEFAULT_USER: &str = "bob";
const DEFAULT_PASSWORD: &str = "builder";
const STORED_KEY: &str = "greeting";
const STORED_VALUE: &str = "hello";

pub(super) fn tests(service: &Arc<FakeService>) -> Vec<TestRef<RunConfig>> {
    let anonymous = anonymous_write(service);
    let writer = writer_login(service);
    let put_get = put_then_get(service, &anonymous, &writer);
    let delete = delete(service, &put_get);
    let capacity = capacity(service, &anonymous, &writer);
    vec![anonymous, writer, put_get, delete, capacity]
}

fn require_auth(config: &RunConfig) -> bool {
    config.setting_bool(STORE, "require-auth").unwrap_or(true)
}

/// Dependencies of every value check
fn writer_dependencies(
    anonymous: &TestRef<RunConfig>,
    writer: &TestRef<RunConfig>,
) -> impl Fn(&RunConfig) -> Vec<TestRef<RunConfig>> + Send + Sync + 'static {
    let anonymous = Arc::clone(anonymous);
    let writer = Arc::clone(writer);
    move |config: &RunConfig| {
        let mut dependencies = Vec::with_capacity(2);
        if require_auth(config) {
            dependencies.push(Arc::clone(&anonymous));
        }
        dependencies.push(Arc::clone(&writer));
        dependencies
    }
}

fn anonymous_write(service: &Arc<FakeService>) -> TestRef<RunConfig> {
    let service = Arc::clone(service);
    Test::new(
        STORE,
        "access",
        "anonymous writes are refused",
        move |config: &RunConfig, _: &mut TestContext| {
            if !require_auth(config) {
                return Ok(TestResult::skip());
            }
            let mut exchange = Exchange::new(&service);

            let response = exchange.send(Request::Put {
                token: None,
                key: STORED_KEY.to_string(),
                value: STORED_VALUE.to_string(),
            })?;
            if response.status != 401 {
                return Ok(exchange.status_mismatch(401, response.status));
            }
            Ok(exchange.finish(TestResult::pass()))
        },
    )
    .into_ref()
}

fn writer_login(service: &Arc<FakeService>) -> TestRef<RunConfig> {
    let service = Arc::clone(service);
    Test::new(
        STORE,
        "session",
        "writer logs in",
        move |config: &RunConfig, ctx: &mut TestContext| {
            let user = config.setting_str(STORE, "user").unwrap_or(DEFAULT_USER);
            let password = config
                .setting_str(STORE, "password")
                .unwrap_or(DEFAULT_PASSWORD);
            let mut exchange = Exchange::new(&service);

            let response = exchange.send(Request::Login {
                user: user.to_string(),
                password: password.to_string(),
            })?;
            if response.status != 200 {
                return Ok(exchange.status_mismatch(200, response.status));
            }
            let Some(token) = response.field("token") else {
                return Ok(exchange.malformed("token"));
            };

            ctx.provide("writer-token", token)?;
            Ok(exchange.finish(TestResult::pass()))
        },
    )
    .with_provides(["writer-token"])
    .into_ref()
}

fn put_then_get(
    service: &Arc<FakeService>,
    anonymous: &TestRef<RunConfig>,
    writer: &TestRef<RunConfig>,
) -> TestRef<RunConfig> {
    let service = Arc::clone(service);
    Test::new(
        STORE,
        "values",
        "stored value can be read back",
        move |_: &RunConfig, ctx: &mut TestContext| {
            let token = ctx.expected_str("writer-token")?.to_string();
            let mut exchange = Exchange::new(&service);

            let response = exchange.send(Request::Put {
                token: Some(token),
                key: STORED_KEY.to_string(),
                value: STORED_VALUE.to_string(),
            })?;
            if response.status != 200 {
                return Ok(exchange.status_mismatch(200, response.status));
            }

            let response = exchange.send(Request::Get {
                key: STORED_KEY.to_string(),
            })?;
            if response.status != 200 {
                return Ok(exchange.status_mismatch(200, response.status));
            }
            if response.field("value") != Some(STORED_VALUE) {
                let actual = json!(response.field("value"));
                return Ok(exchange.finish(
                    TestResult::fail(Failure::new(
                        "value mismatch",
                        "read back a different value than was written",
                    ))
                    .with_comparison(json!(STORED_VALUE), actual),
                ));
            }

            ctx.provide("stored-key", STORED_KEY)?;
            Ok(exchange.finish(TestResult::pass()))
        },
    )
    .with_resolver(writer_dependencies(anonymous, writer))
    .with_expects(["writer-token"])
    .with_provides(["stored-key"])
    .into_ref()
}

fn delete(service: &Arc<FakeService>, put_get: &TestRef<RunConfig>) -> TestRef<RunConfig> {
    let service = Arc::clone(service);
    Test::new(
        STORE,
        "values",
        "deleted value is gone",
        move |_: &RunConfig, ctx: &mut TestContext| {
            let token = ctx.expected_str("writer-token")?.to_string();
            let key = ctx.expected_str("stored-key")?.to_string();
            let mut exchange = Exchange::new(&service);

            let response = exchange.send(Request::Delete {
                token: Some(token),
                key: key.clone(),
            })?;
            if response.status != 204 {
                return Ok(exchange.status_mismatch(204, response.status));
            }

            let response = exchange.send(Request::Get { key })?;
            if response.status != 404 {
                return Ok(exchange.status_mismatch(404, response.status));
            }
            Ok(exchange.finish(TestResult::pass()))
        },
    )
    .with_dependencies(vec![Arc::clone(put_get)])
    .with_expects(["writer-token", "stored-key"])
    .into_ref()
}

fn capacity(
    service: &Arc<FakeService>,
    anonymous: &TestRef<RunConfig>,
    writer: &TestRef<RunConfig>,
) -> TestRef<RunConfig> {
    let service = Arc::clone(service);
    Test::new(
        STORE,
        "limits",
        "writes beyond capacity are refused",
        move |config: &RunConfig, ctx: &mut TestContext| {
            let token = ctx.expected_str("writer-token")?.to_string();
            let capacity = match config.setting_int(STORE, "capacity") {
                Some(n) if n > 0 => n as usize,
                Some(n) => anyhow::bail!("store capacity must be positive, got {}", n),
                None => DEFAULT_CAPACITY,
            };
            let mut exchange = Exchange::new(&service);

            // Keys already in the store count towards the limit, so the
            // refusal may come early but must come within capacity + 1 writes
            let mut written = Vec::new();
            let mut refused = false;
            for i in 0..=capacity {
                let key = format!("fill-{}", i);
                let response = exchange.send(Request::Put {
                    token: Some(token.clone()),
                    key: key.clone(),
                    value: i.to_string(),
                })?;
                match response.status {
                    200 => written.push(key),
                    507 => {
                        refused = true;
                        break;
                    }
                    status => return Ok(exchange.status_mismatch(200, status)),
                }
            }

            for key in written.iter().cloned() {
                exchange.send(Request::Delete {
                    token: Some(token.clone()),
                    key,
                })?;
            }

            if !refused {
                return Ok(exchange.finish(
                    TestResult::fail(Failure::new(
                        "capacity not enforced",
                        format!("all {} writes were accepted", capacity + 1),
                    ))
                    .with_comparison(json!(capacity), json!(written.len())),
                ));
            }
            Ok(exchange.finish(TestResult::pass()))
        },
    )
    .with_resolver(writer_dependencies(anonymous, writer))
    .with_expects(["writer-token"])
    .into_ref()
}
