//! Integration tests for the session commands.


use assert_cmd::cargo::cargo_bin_cmd;
use fixtures::{ALICE_TOKEN, api_url, can_bind_localhost, read_storage, seed_storage, temp_home};
use predicates::prelude::*;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_login_persists_token_and_cookie() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(serde_json::json!({"username": "alice", "password": "pw"})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "set-cookie",
                    "refreshToken=r1; Path=/api/auth; Max-Age=604800; HttpOnly; SameSite=Strict",
                )
                .set_body_json(serde_json::json!({"accessToken": ALICE_TOKEN})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/favorites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    cargo_bin_cmd!("recipebox")
        .env("RECIPEBOX_HOME", home.path())
        .env("RECIPEBOX_BASE_URL", api_url(&server))
        .args(["login", "--username", "alice"])
        .write_stdin("pw\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in"));

    let storage = read_storage(home.path());
    assert_eq!(storage["accessToken"], ALICE_TOKEN);
    assert!(
        storage["rs_cookies"]
            .as_str()
            .is_some_and(|jar| jar.contains("refreshToken"))
    );

    cargo_bin_cmd!("recipebox")
        .env("RECIPEBOX_HOME", home.path())
        .env("RECIPEBOX_BASE_URL", api_url(&server))
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Hi, alice"));
}

#[tokio::test]
async fn test_failed_login_reports_error_and_stays_anonymous() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"accessToken": null, "refreshToken": null})),
        )
        .mount(&server)
        .await;

    cargo_bin_cmd!("recipebox")
        .env("RECIPEBOX_HOME", home.path())
        .env("RECIPEBOX_BASE_URL", api_url(&server))
        .args(["login", "--username", "alice", "--password", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Login failed"));

    assert!(read_storage(home.path()).get("accessToken").is_none());
}

#[tokio::test]
async fn test_register_shows_server_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"error": "Username already exists!"})),
        )
        .mount(&server)
        .await;

    cargo_bin_cmd!("recipebox")
        .env("RECIPEBOX_HOME", home.path())
        .env("RECIPEBOX_BASE_URL", api_url(&server))
        .args(["register", "--username", "alice", "--password", "pw"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Username already exists!"));
}

#[tokio::test]
async fn test_logout_clears_token_when_server_fails() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;
    seed_storage(
        home.path(),
        &serde_json::json!({"accessToken": ALICE_TOKEN, "rs_searchTitle": "eggs"}),
    );

    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("recipebox")
        .env("RECIPEBOX_HOME", home.path())
        .env("RECIPEBOX_BASE_URL", api_url(&server))
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out"));

    let storage = read_storage(home.path());
    assert!(storage.get("accessToken").is_none());
    assert_eq!(storage["rs_searchTitle"], "eggs");
}

#[test]
fn test_whoami_when_anonymous() {
    let home = temp_home();

    cargo_bin_cmd!("recipebox")
        .env("RECIPEBOX_HOME", home.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}
