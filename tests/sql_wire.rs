use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::net::TcpListener;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, Config, NoTls, SimpleQueryMessage, SimpleQueryRow};

use rota::config::{EngineConfig, Users};
use rota::seed::Seed;
use rota::tenant::TenantManager;
use rota::wire;

// ── Test infrastructure ──────────────────────────────────────

const USERS: &str = "admin:secret:admin,planner:plan:editor,guest:guest:viewer";

fn unique_dir() -> std::path::PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("rota_int_test_{}_{nanos}_{n}", std::process::id()))
}

async fn start_test_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let dir = unique_dir();
    std::fs::create_dir_all(&dir).unwrap();
    let tm = Arc::new(
        TenantManager::new(dir, 1000, EngineConfig::default()).with_seed(Seed::sample().unwrap()),
    );
    let users = Arc::new(Users::parse(USERS).unwrap());

    tokio::spawn(async move {
        loop {
            let (socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let tm = tm.clone();
            let users = users.clone();
            tokio::spawn(async move {
                let _ = wire::process_connection(socket, tm, users, None).await;
            });
        }
    });

    addr
}

async fn try_connect(addr: SocketAddr, db: &str, user: &str, password: &str) -> Result<Client, tokio_postgres::Error> {
    let mut config = Config::new();
    config
        .host(addr.ip().to_string())
        .port(addr.port())
        .dbname(db)
        .user(user)
        .password(password);

    let (client, connection) = config.connect(NoTls).await?;
    tokio::spawn(async move {
        let _ = connection.await;
    });
    Ok(client)
}

async fn connect(addr: SocketAddr, user: &str, password: &str) -> Client {
    try_connect(addr, "team", user, password).await.unwrap()
}

async fn rows(client: &Client, sql: &str) -> Vec<SimpleQueryRow> {
    client
        .simple_query(sql)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|msg| match msg {
            SimpleQueryMessage::Row(row) => Some(row),
            _ => None,
        })
        .collect()
}

async fn affected(client: &Client, sql: &str) -> u64 {
    client
        .simple_query(sql)
        .await
        .unwrap()
        .into_iter()
        .find_map(|msg| match msg {
            SimpleQueryMessage::CommandComplete(n) => Some(n),
            _ => None,
        })
        .unwrap()
}

async fn sqlstate(client: &Client, sql: &str) -> SqlState {
    let err = client.simple_query(sql).await.unwrap_err();
    err.code().cloned().unwrap()
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn new_tenant_starts_from_sample_data() {
    let addr = start_test_server().await;
    let client = connect(addr, "guest", "guest").await;

    let members = rows(&client, "SELECT * FROM members WHERE active = true").await;
    assert_eq!(members.len(), 14);
    assert_eq!(members[0].get("name"), Some("Ajin George"));

    let shifts = rows(&client, "SELECT * FROM shifts WHERE date = '2026-01-19'").await;
    let ids: Vec<&str> = shifts.iter().map(|r| r.get("id").unwrap()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
    assert_eq!(shifts[0].get("shift"), Some("JPN"));
    assert_eq!(shifts[0].get("member_name"), Some("Febin Bincy"));

    let labels = rows(&client, "SELECT * FROM assignments").await;
    assert_eq!(labels.len(), 5);
}

#[tokio::test]
async fn shift_scenarios_over_the_wire() {
    let addr = start_test_server().await;
    let client = connect(addr, "planner", "plan").await;

    let created = rows(
        &client,
        "INSERT INTO shifts (date, shift, member_id, slot, assignment) \
         VALUES ('2026-02-01', 'JPN', 6, 1, 'M1') RETURNING *",
    )
    .await;
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].get("id"), Some("1"));
    assert_eq!(created[0].get("member_name"), Some("Febin Bincy"));

    let code = sqlstate(
        &client,
        "INSERT INTO shifts (date, shift, member_id, slot) VALUES ('2026-02-01', 'IST', 8, 1)",
    )
    .await;
    assert_eq!(code, SqlState::EXCLUSION_VIOLATION);

    let code = sqlstate(
        &client,
        "INSERT INTO shifts (date, shift, member_id, slot) VALUES ('2026-02-01', 'JPN', 8, 3)",
    )
    .await;
    assert_eq!(code, SqlState::CHECK_VIOLATION);

    let on_leave = rows(
        &client,
        "INSERT INTO leave (date, member_id, reason) VALUES ('2026-02-01', 1, 'Training') RETURNING *",
    )
    .await;
    assert_eq!(on_leave[0].get("id"), Some("2"));
    assert_eq!(on_leave[0].get("member_name"), Some("Debin Robert"));

    let free = rows(&client, "SELECT * FROM free_slots WHERE date = '2026-02-01'").await;
    let slots: Vec<&str> = free.iter().map(|r| r.get("slot").unwrap()).collect();
    assert_eq!(slots, vec!["2", "3", "4", "5", "6"]);
}

#[tokio::test]
async fn unwritten_day_reads_as_empty_document() {
    let addr = start_test_server().await;
    let client = connect(addr, "guest", "guest").await;

    let docs = rows(&client, "SELECT * FROM schedules WHERE date = '2030-06-03'").await;
    assert_eq!(docs.len(), 1);
    let doc: serde_json::Value = serde_json::from_str(docs[0].get("schedule").unwrap()).unwrap();
    assert_eq!(
        doc,
        serde_json::json!({
            "shifts": {
                "JPN": [], "IST": [], "CET_EARLY": [], "CET_LATE": [], "US_EARLY": [], "US_LATE": []
            },
            "onLeave": []
        })
    );
    assert!(rows(&client, "SELECT * FROM shifts WHERE date = '2030-06-03'").await.is_empty());
}

#[tokio::test]
async fn update_into_taken_slot_is_rejected() {
    let addr = start_test_server().await;
    let client = connect(addr, "planner", "plan").await;

    // Slot 2 belongs to entry 2 on the sample day.
    let code = sqlstate(
        &client,
        "UPDATE shifts SET slot = 2 WHERE date = '2026-01-19' AND shift = 'JPN' AND id = 1",
    )
    .await;
    assert_eq!(code, SqlState::EXCLUSION_VIOLATION);

    let jpn = rows(&client, "SELECT * FROM shifts WHERE date = '2026-01-19' AND shift = 'JPN'").await;
    assert_eq!(jpn[0].get("slot"), Some("1"));
}

#[tokio::test]
async fn missing_targets_affect_zero_rows() {
    let addr = start_test_server().await;
    let client = connect(addr, "planner", "plan").await;

    assert_eq!(
        affected(
            &client,
            "UPDATE shifts SET slot = NULL WHERE date = '2031-01-01' AND shift = 'JPN' AND id = 1",
        )
        .await,
        0
    );
    assert_eq!(
        affected(&client, "DELETE FROM leave WHERE date = '2026-01-19' AND id = 9").await,
        0
    );
    assert_eq!(
        affected(
            &client,
            "UPDATE shifts SET assignment = NULL WHERE date = '2026-01-19' AND shift = 'JPN' AND id = 1",
        )
        .await,
        1
    );
    assert_eq!(
        affected(&client, "DELETE FROM shifts WHERE date = '2026-01-19' AND shift = 'IST' AND id = 3").await,
        1
    );
    let ist = rows(&client, "SELECT * FROM shifts WHERE date = '2026-01-19' AND shift = 'IST'").await;
    assert_eq!(ist.len(), 1);
}

#[tokio::test]
async fn paste_copies_sample_day() {
    let addr = start_test_server().await;
    let client = connect(addr, "planner", "plan").await;

    let n = affected(
        &client,
        "INSERT INTO pastes (source, target) VALUES ('2026-01-19', '2026-02-02'), ('2026-01-19', '2026-02-03')",
    )
    .await;
    assert_eq!(n, 2);

    // Copies draw from one counter above every stored id.
    for (date, first_id) in [("2026-02-02", 5), ("2026-02-03", 11)] {
        let shifts = rows(&client, &format!("SELECT * FROM shifts WHERE date = '{date}'")).await;
        let leave = rows(&client, &format!("SELECT * FROM leave WHERE date = '{date}'")).await;
        assert_eq!((shifts.len(), leave.len()), (4, 2));
        let ids: Vec<String> = shifts
            .iter()
            .chain(leave.iter())
            .map(|r| r.get("id").unwrap().to_string())
            .collect();
        let expected: Vec<String> = (first_id..first_id + 6).map(|id| id.to_string()).collect();
        assert_eq!(ids, expected);
    }

    let n = affected(
        &client,
        "INSERT INTO pastes (source, start_date, end_date) VALUES ('2026-01-19', '2026-02-06', '2026-02-10')",
    )
    .await;
    assert_eq!(n, 3);
    assert!(rows(&client, "SELECT * FROM shifts WHERE date = '2026-02-07'").await.is_empty());

    let code = sqlstate(
        &client,
        "INSERT INTO pastes (source, start_date, end_date) VALUES ('2026-01-19', '2026-02-10', '2026-02-06')",
    )
    .await;
    assert_eq!(code, SqlState::DATETIME_FIELD_OVERFLOW);
}

#[tokio::test]
async fn roles_gate_commands() {
    let addr = start_test_server().await;

    let guest = connect(addr, "guest", "guest").await;
    let code = sqlstate(
        &guest,
        "INSERT INTO leave (date, member_id, reason) VALUES ('2026-02-01', 1, 'Training')",
    )
    .await;
    assert_eq!(code, SqlState::INSUFFICIENT_PRIVILEGE);

    let planner = connect(addr, "planner", "plan").await;
    let code = sqlstate(&planner, "INSERT INTO members (name) VALUES ('Asha Menon')").await;
    assert_eq!(code, SqlState::INSUFFICIENT_PRIVILEGE);
    assert_eq!(affected(&planner, "INSERT INTO assignments (label) VALUES ('M6'), ('M1')").await, 1);

    let admin = connect(addr, "admin", "secret").await;
    let added = rows(&admin, "INSERT INTO members (name) VALUES ('Asha Menon') RETURNING *").await;
    assert_eq!(added[0].get("id"), Some("15"));
    assert_eq!(added[0].get("active"), Some("t"));
}

#[tokio::test]
async fn wrong_password_is_refused() {
    let addr = start_test_server().await;
    assert!(try_connect(addr, "team", "admin", "nope").await.is_err());
    assert!(try_connect(addr, "team", "nobody", "secret").await.is_err());
}

#[tokio::test]
async fn unknown_member_and_bad_input_have_distinct_codes() {
    let addr = start_test_server().await;
    let client = connect(addr, "planner", "plan").await;

    let code = sqlstate(
        &client,
        "INSERT INTO shifts (date, shift, member_id) VALUES ('2026-02-01', 'IST', 99)",
    )
    .await;
    assert_eq!(code, SqlState::FOREIGN_KEY_VIOLATION);

    let code = sqlstate(
        &client,
        "INSERT INTO shifts (date, shift, member_id) VALUES ('2026-02-01', 'NIGHT', 1)",
    )
    .await;
    assert_eq!(code, SqlState::INVALID_PARAMETER_VALUE);

    let code = sqlstate(&client, "SELECT * FROM nowhere").await;
    assert_eq!(code, SqlState::UNDEFINED_TABLE);

    let code = sqlstate(&client, "SELEC nonsense").await;
    assert_eq!(code, SqlState::SYNTAX_ERROR);
}

#[tokio::test]
async fn tenants_are_isolated_by_database() {
    let addr = start_test_server().await;
    let team = connect(addr, "planner", "plan").await;
    let other = try_connect(addr, "other_team", "planner", "plan").await.unwrap();

    affected(
        &team,
        "INSERT INTO leave (date, member_id, reason) VALUES ('2026-02-01', 1, 'Training')",
    )
    .await;
    assert_eq!(rows(&team, "SELECT * FROM leave WHERE date = '2026-02-01'").await.len(), 1);
    assert!(rows(&other, "SELECT * FROM leave WHERE date = '2026-02-01'").await.is_empty());
}

#[tokio::test]
async fn extended_protocol_with_parameters() {
    let addr = start_test_server().await;
    let client = connect(addr, "planner", "plan").await;

    let inserted = client
        .query(
            "INSERT INTO shifts (date, shift, member_id, slot, assignment) VALUES ($1, $2, $3, $4, $5) RETURNING *",
            &[&"2026-02-01", &"US_LATE", &"9", &"6", &"M5"],
        )
        .await
        .unwrap();
    assert_eq!(inserted.len(), 1);
    let id: i64 = inserted[0].get("id");
    let slot: Option<i32> = inserted[0].get("slot");
    assert_eq!((id, slot), (1, Some(6)));

    let selected = client
        .query("SELECT * FROM shifts WHERE date = $1", &[&"2026-02-01"])
        .await
        .unwrap();
    assert_eq!(selected.len(), 1);
    let name: &str = selected[0].get("member_name");
    assert_eq!(name, "Lham Tsering");

    let n = client
        .execute(
            "DELETE FROM shifts WHERE date = $1 AND shift = $2 AND id = $3",
            &[&"2026-02-01", &"US_LATE", &"1"],
        )
        .await
        .unwrap();
    assert_eq!(n, 1);

    let catalog = client.query("SELECT * FROM shift_catalog", &[]).await.unwrap();
    assert_eq!(catalog.len(), 6);
    let slots: &str = catalog[0].get("slots");
    assert_eq!(slots, "1,2");
}
