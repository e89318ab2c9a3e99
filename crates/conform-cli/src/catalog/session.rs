//! `session` area: login, identity and logout

use super::{Exchange, FakeService, Request, SESSION};
use conform_config::RunConfig;
use conform_engine::{Failure, Test, TestContext, TestRef, TestResult};
use serde_json::json;
use std::sync::Arc;

const DEFAULT_USER: &str = "alice";
const DEFAULT_PASSWORD: &str = "wonderland";

pub(super) fn tests(service: &Arc<FakeService>) -> Vec<TestRef<RunConfig>> {
    let login = login(service);
    let whoami = whoami(service, &login);
    let logout = logout(service, &whoami);
    vec![login, wrong_password(service), whoami, logout]
}

fn credentials(config: &RunConfig) -> (String, String) {
    let user = config.setting_str(SESSION, "user").unwrap_or(DEFAULT_USER);
    let password = config
        .setting_str(SESSION, "password")
        .unwrap_or(DEFAULT_PASSWORD);
    (user.to_string(), password.to_string())
}

fn login(service: &Arc<FakeService>) -> TestRef<RunConfig> {
    let service = Arc::clone(service);
    Test::new(
        SESSION,
        "login",
        "valid credentials issue a token",
        move |config: &RunConfig, ctx: &mut TestContext| {
            let (user, password) = credentials(config);
            let mut exchange = Exchange::new(&service);

            let response = exchange.send(Request::Login {
                user: user.clone(),
                password,
            })?;
            if response.status != 200 {
                return Ok(exchange.status_mismatch(200, response.status));
            }
            let Some(token) = response.field("token") else {
                return Ok(exchange.malformed("token"));
            };

            ctx.provide("token", token)?;
            ctx.provide("user", user)?;
            Ok(exchange.finish(TestResult::pass()))
        },
    )
    .with_provides(["token", "user"])
    .into_ref()
}

fn wrong_password(service: &Arc<FakeService>) -> TestRef<RunConfig> {
    let service = Arc::clone(service);
    Test::new(
        SESSION,
        "login",
        "wrong password is rejected",
        move |config: &RunConfig, _: &mut TestContext| {
            let (user, password) = credentials(config);
            let mut exchange = Exchange::new(&service);

            let response = exchange.send(Request::Login {
                user,
                password: format!("{}!", password),
            })?;
            if response.status != 401 {
                return Ok(exchange.status_mismatch(401, response.status));
            }
            Ok(exchange.finish(TestResult::pass()))
        },
    )
    .into_ref()
}

fn whoami(service: &Arc<FakeService>, login: &TestRef<RunConfig>) -> TestRef<RunConfig> {
    let service = Arc::clone(service);
    Test::new(
        SESSION,
        "identity",
        "whoami reports the logged-in user",
        move |_: &RunConfig, ctx: &mut TestContext| {
            let token = ctx.expected_str("token")?.to_string();
            let user = ctx.expected_str("user")?.to_string();
            let mut exchange = Exchange::new(&service);

            let response = exchange.send(Request::Whoami { token })?;
            if response.status != 200 {
                return Ok(exchange.status_mismatch(200, response.status));
            }
            match response.field("user") {
                Some(reported) if reported == user => Ok(exchange.finish(TestResult::pass())),
                reported => {
                    let actual = json!(reported);
                    Ok(exchange.finish(
                        TestResult::fail(Failure::new(
                            "identity mismatch",
                            format!("whoami did not report '{}'", user),
                        ))
                        .with_comparison(json!(user), actual),
                    ))
                }
            }
        },
    )
    .with_dependencies(vec![Arc::clone(login)])
    .with_expects(["token", "user"])
    .into_ref()
}

fn logout(service: &Arc<FakeService>, whoami: &TestRef<RunConfig>) -> TestRef<RunConfig> {
    let service = Arc::clone(service);
    Test::new(
        SESSION,
        "logout",
        "logout revokes the token",
        move |_: &RunConfig, ctx: &mut TestContext| {
            let token = ctx.expected_str("token")?.to_string();
            let mut exchange = Exchange::new(&service);

            let response = exchange.send(Request::Logout {
                token: token.clone(),
            })?;
            if response.status != 204 {
                return Ok(exchange.status_mismatch(204, response.status));
            }

            let response = exchange.send(Request::Whoami { token })?;
            if response.status != 401 {
                return Ok(exchange.status_mismatch(401, response.status));
            }
            Ok(exchange.finish(TestResult::pass()))
        },
    )
    .with_dependencies(vec![Arc::clone(whoami)])
    .with_expects(["token"])
    .into_ref()
}
