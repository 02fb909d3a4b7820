use std::fmt::Debug;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream;
use futures::Sink;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::data::DataRow;
use pgwire::messages::PgWireBackendMessage;
use pgwire::tokio::TlsAcceptor;
use tokio::net::TcpStream;
use tracing::debug;

use crate::auth::RotaAuthSource;
use crate::catalog;
use crate::config::Users;
use crate::engine::{Engine, EngineError};
use crate::model::*;
use crate::observability::{command_label, QUERIES_TOTAL, QUERY_DURATION_SECONDS};
use crate::sql::{self, Command, ResultShape, SqlError};
use crate::tenant::TenantManager;

pub struct RotaHandler {
    tenant_manager: Arc<TenantManager>,
    users: Arc<Users>,
    query_parser: Arc<RotaQueryParser>,
}

impl RotaHandler {
    pub fn new(tenant_manager: Arc<TenantManager>, users: Arc<Users>) -> Self {
        Self {
            tenant_manager,
            users,
            query_parser: Arc::new(RotaQueryParser),
        }
    }

    async fn resolve_engine<C: ClientInfo>(&self, client: &C) -> PgWireResult<Arc<Engine>> {
        let db = client
            .metadata()
            .get("database")
            .cloned()
            .unwrap_or_else(|| "default".to_string());
        self.tenant_manager.get_or_create(&db).await.map_err(|e| {
            PgWireError::UserError(Box::new(ErrorInfo::new(
                "ERROR".into(),
                "08006".into(),
                format!("tenant error: {e}"),
            )))
        })
    }

    fn authorize<C: ClientInfo>(&self, client: &C, cmd: &Command) -> PgWireResult<()> {
        let user = client.metadata().get("user").map(String::as_str).unwrap_or("");
        let required = cmd.required_role();
        match self.users.role_of(user) {
            Some(role) if role.allows(required) => Ok(()),
            role => {
                debug!(user, ?role, ?required, "command denied");
                Err(user_error(
                    "42501",
                    format!("permission denied: {required} role required"),
                ))
            }
        }
    }

    /// Parse, authorize and execute one statement, recording query metrics.
    async fn run<C: ClientInfo>(
        &self,
        client: &C,
        query: &str,
        format: Option<&Format>,
    ) -> PgWireResult<Response> {
        let cmd = match sql::parse_sql(query) {
            Ok(cmd) => cmd,
            Err(e) => {
                metrics::counter!(QUERIES_TOTAL, "command" => "unparsed", "status" => "error")
                    .increment(1);
                return Err(sql_err(e));
            }
        };
        let label = command_label(&cmd);
        let started = Instant::now();
        let result = async {
            self.authorize(client, &cmd)?;
            let engine = self.resolve_engine(client).await?;
            self.execute_command(&engine, cmd, format).await
        }
        .await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(QUERIES_TOTAL, "command" => label, "status" => status).increment(1);
        metrics::histogram!(QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn execute_command(
        &self,
        engine: &Engine,
        cmd: Command,
        format: Option<&Format>,
    ) -> PgWireResult<Response> {
        match cmd {
            Command::InsertShift {
                date,
                shift,
                member_id,
                slot,
                assignment,
                returning,
            } => {
                let member = engine.resolve_member(member_id).await.map_err(engine_err)?;
                let entry = engine
                    .add_shift_member(
                        date,
                        shift,
                        NewShiftEntry {
                            member_id,
                            member_name: member.name,
                            slot,
                            assignment,
                        },
                    )
                    .await
                    .map_err(engine_err)?;
                if returning {
                    let schema = schema(ResultShape::Shifts, format);
                    let row = encode_shift(&schema, date, shift, &entry);
                    Ok(query_response(schema, vec![row]))
                } else {
                    Ok(Response::Execution(Tag::new("INSERT").with_rows(1)))
                }
            }
            Command::UpdateShift {
                date,
                shift,
                id,
                member_id,
                slot,
                assignment,
            } => {
                let member_name = match member_id {
                    Some(member_id) => Some(
                        engine
                            .resolve_member(member_id)
                            .await
                            .map_err(engine_err)?
                            .name,
                    ),
                    None => None,
                };
                let update = EntryUpdate {
                    member_id,
                    member_name,
                    slot,
                    assignment,
                };
                let outcome = engine
                    .update_shift_member(date, shift, id, update)
                    .await
                    .map_err(engine_err)?;
                Ok(execution("UPDATE", outcome.is_applied()))
            }
            Command::DeleteShift { date, shift, id } => {
                let outcome = engine
                    .delete_shift_member(date, shift, id)
                    .await
                    .map_err(engine_err)?;
                Ok(execution("DELETE", outcome.is_applied()))
            }
            Command::InsertLeave {
                date,
                member_id,
                reason,
                returning,
            } => {
                let member = engine.resolve_member(member_id).await.map_err(engine_err)?;
                let entry = engine
                    .add_on_leave(
                        date,
                        NewLeaveEntry {
                            member_id,
                            member_name: member.name,
                            reason,
                        },
                    )
                    .await
                    .map_err(engine_err)?;
                if returning {
                    let schema = schema(ResultShape::Leave, format);
                    let row = encode_leave(&schema, date, &entry);
                    Ok(query_response(schema, vec![row]))
                } else {
                    Ok(Response::Execution(Tag::new("INSERT").with_rows(1)))
                }
            }
            Command::DeleteLeave { date, id } => {
                let outcome = engine.delete_on_leave(date, id).await.map_err(engine_err)?;
                Ok(execution("DELETE", outcome.is_applied()))
            }
            Command::InsertMember { name, returning } => {
                let member = engine.add_member(&name).await.map_err(engine_err)?;
                if returning {
                    let schema = schema(ResultShape::Members, format);
                    let row = encode_member(&schema, &member);
                    Ok(query_response(schema, vec![row]))
                } else {
                    Ok(Response::Execution(Tag::new("INSERT").with_rows(1)))
                }
            }
            Command::UpdateMember { id, update } => {
                match engine.update_member(id, update).await {
                    Ok(_) => Ok(execution("UPDATE", true)),
                    Err(EngineError::MemberNotFound(_)) => Ok(execution("UPDATE", false)),
                    Err(e) => Err(engine_err(e)),
                }
            }
            Command::DeleteMember { id } => match engine.remove_member(id).await {
                Ok(_) => Ok(execution("DELETE", true)),
                Err(EngineError::MemberNotFound(_)) => Ok(execution("DELETE", false)),
                Err(e) => Err(engine_err(e)),
            },
            Command::InsertAssignmentLabels { labels } => {
                let mut added = 0;
                for label in &labels {
                    if engine.add_assignment_label(label).await.map_err(engine_err)? {
                        added += 1;
                    }
                }
                Ok(Response::Execution(Tag::new("INSERT").with_rows(added)))
            }
            Command::InsertLeaveReasons { reasons } => {
                let mut added = 0;
                for reason in &reasons {
                    if engine.add_leave_reason(reason).await.map_err(engine_err)? {
                        added += 1;
                    }
                }
                Ok(Response::Execution(Tag::new("INSERT").with_rows(added)))
            }
            Command::Paste { source, targets } => {
                let report = engine
                    .paste_day(source, &targets)
                    .await
                    .map_err(engine_err)?;
                Ok(Response::Execution(
                    Tag::new("INSERT").with_rows(report.dates.len()),
                ))
            }
            Command::SelectShifts { date, shift } => {
                let schema = schema(ResultShape::Shifts, format);
                let day = engine.schedule(date).await;
                let rows = day
                    .shift_entries()
                    .filter(|(s, _)| shift.is_none_or(|wanted| wanted == *s))
                    .map(|(s, entry)| encode_shift(&schema, date, s, entry))
                    .collect();
                Ok(query_response(schema, rows))
            }
            Command::SelectLeave { date } => {
                let schema = schema(ResultShape::Leave, format);
                let day = engine.schedule(date).await;
                let rows = day
                    .on_leave
                    .iter()
                    .map(|entry| encode_leave(&schema, date, entry))
                    .collect();
                Ok(query_response(schema, rows))
            }
            Command::SelectSchedules { date } => {
                let schema = schema(ResultShape::Schedules, format);
                let days = match date {
                    Some(date) => vec![(date, engine.schedule(date).await)],
                    None => engine.scan_schedules().await,
                };
                let rows = days
                    .iter()
                    .map(|(date, day)| encode_schedule(&schema, *date, day))
                    .collect();
                Ok(query_response(schema, rows))
            }
            Command::SelectMembers { active } => {
                let schema = schema(ResultShape::Members, format);
                let members = match active {
                    Some(true) => engine.list_active_members().await,
                    Some(false) => engine
                        .list_all_members()
                        .await
                        .into_iter()
                        .filter(|m| !m.active)
                        .collect(),
                    None => engine.list_all_members().await,
                };
                let rows = members
                    .iter()
                    .map(|m| encode_member(&schema, m))
                    .collect();
                Ok(query_response(schema, rows))
            }
            Command::SelectAssignmentLabels => {
                let schema = schema(ResultShape::AssignmentLabels, format);
                let rows = engine
                    .assignment_labels()
                    .await
                    .iter()
                    .map(|label| encode_text(&schema, label))
                    .collect();
                Ok(query_response(schema, rows))
            }
            Command::SelectLeaveReasons => {
                let schema = schema(ResultShape::LeaveReasons, format);
                let rows = engine
                    .leave_reasons()
                    .await
                    .iter()
                    .map(|reason| encode_text(&schema, reason))
                    .collect();
                Ok(query_response(schema, rows))
            }
            Command::SelectFreeSlots { date } => {
                let schema = schema(ResultShape::FreeSlots, format);
                let rows = engine
                    .free_slots(date)
                    .await
                    .into_iter()
                    .map(|slot| {
                        let info = catalog::slot_info(slot);
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&i32::from(slot.get()))?;
                        encoder.encode_field(&info.ist_range)?;
                        encoder.encode_field(&info.cet_range)?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(query_response(schema, rows))
            }
            Command::SelectEmptyShifts { date } => {
                let schema = schema(ResultShape::EmptyShifts, format);
                let rows = engine
                    .empty_shifts(date)
                    .await
                    .into_iter()
                    .map(|shift| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&shift.as_str())?;
                        encoder.encode_field(&catalog::shift_info(shift).label)?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(query_response(schema, rows))
            }
            Command::SelectBookedMembers { date } => {
                let schema = schema(ResultShape::BookedMembers, format);
                let mut rows = Vec::new();
                for id in engine.booked_member_ids(date).await {
                    let name = engine.member(id).await.map(|m| m.name);
                    let mut encoder = DataRowEncoder::new(schema.clone());
                    encoder.encode_field(&i64::from(id))?;
                    encoder.encode_field(&name)?;
                    rows.push(Ok(encoder.take_row()));
                }
                Ok(query_response(schema, rows))
            }
            Command::SelectShiftCatalog => {
                let schema = schema(ResultShape::ShiftCatalog, format);
                let rows = catalog::SHIFTS
                    .iter()
                    .map(|info| {
                        let slots: Vec<String> =
                            info.slots.iter().map(|s| s.to_string()).collect();
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&info.shift.as_str())?;
                        encoder.encode_field(&info.label)?;
                        encoder.encode_field(&info.time_range)?;
                        encoder.encode_field(&slots.join(","))?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(query_response(schema, rows))
            }
        }
    }
}

fn execution(tag: &str, applied: bool) -> Response {
    Response::Execution(Tag::new(tag).with_rows(usize::from(applied)))
}

fn query_response(schema: Arc<Vec<FieldInfo>>, rows: Vec<PgWireResult<DataRow>>) -> Response {
    Response::Query(QueryResponse::new(schema, stream::iter(rows)))
}

// ── Row encoding ─────────────────────────────────────────────────

fn encode_shift(
    schema: &Arc<Vec<FieldInfo>>,
    date: Date,
    shift: ShiftType,
    entry: &ShiftEntry,
) -> PgWireResult<DataRow> {
    let mut encoder = DataRowEncoder::new(schema.clone());
    encoder.encode_field(&date.to_string())?;
    encoder.encode_field(&shift.as_str())?;
    encoder.encode_field(&i64::from(entry.id))?;
    encoder.encode_field(&i64::from(entry.member_id))?;
    encoder.encode_field(&entry.member_name)?;
    encoder.encode_field(&entry.slot.map(|s| i32::from(s.get())))?;
    encoder.encode_field(&entry.assignment)?;
    Ok(encoder.take_row())
}

fn encode_leave(
    schema: &Arc<Vec<FieldInfo>>,
    date: Date,
    entry: &LeaveEntry,
) -> PgWireResult<DataRow> {
    let mut encoder = DataRowEncoder::new(schema.clone());
    encoder.encode_field(&date.to_string())?;
    encoder.encode_field(&i64::from(entry.id))?;
    encoder.encode_field(&i64::from(entry.member_id))?;
    encoder.encode_field(&entry.member_name)?;
    encoder.encode_field(&entry.reason)?;
    Ok(encoder.take_row())
}

fn encode_schedule(
    schema: &Arc<Vec<FieldInfo>>,
    date: Date,
    day: &DaySchedule,
) -> PgWireResult<DataRow> {
    let json = serde_json::to_string(day).map_err(|e| PgWireError::ApiError(Box::new(e)))?;
    let mut encoder = DataRowEncoder::new(schema.clone());
    encoder.encode_field(&date.to_string())?;
    encoder.encode_field(&json)?;
    Ok(encoder.take_row())
}

fn encode_member(schema: &Arc<Vec<FieldInfo>>, member: &TeamMember) -> PgWireResult<DataRow> {
    let mut encoder = DataRowEncoder::new(schema.clone());
    encoder.encode_field(&i64::from(member.id))?;
    encoder.encode_field(&member.name)?;
    encoder.encode_field(&member.active)?;
    Ok(encoder.take_row())
}

fn encode_text(schema: &Arc<Vec<FieldInfo>>, value: &String) -> PgWireResult<DataRow> {
    let mut encoder = DataRowEncoder::new(schema.clone());
    encoder.encode_field(value)?;
    Ok(encoder.take_row())
}

// ── Schemas ──────────────────────────────────────────────────────

fn columns(shape: ResultShape) -> Vec<(&'static str, Type)> {
    match shape {
        ResultShape::Shifts => vec![
            ("date", Type::VARCHAR),
            ("shift", Type::VARCHAR),
            ("id", Type::INT8),
            ("member_id", Type::INT8),
            ("member_name", Type::VARCHAR),
            ("slot", Type::INT4),
            ("assignment", Type::VARCHAR),
        ],
        ResultShape::Leave => vec![
            ("date", Type::VARCHAR),
            ("id", Type::INT8),
            ("member_id", Type::INT8),
            ("member_name", Type::VARCHAR),
            ("reason", Type::VARCHAR),
        ],
        // The document goes out as JSON text.
        ResultShape::Schedules => vec![("date", Type::VARCHAR), ("schedule", Type::VARCHAR)],
        ResultShape::Members => vec![
            ("id", Type::INT8),
            ("name", Type::VARCHAR),
            ("active", Type::BOOL),
        ],
        ResultShape::AssignmentLabels => vec![("label", Type::VARCHAR)],
        ResultShape::LeaveReasons => vec![("reason", Type::VARCHAR)],
        ResultShape::FreeSlots => vec![
            ("slot", Type::INT4),
            ("ist_range", Type::VARCHAR),
            ("cet_range", Type::VARCHAR),
        ],
        ResultShape::EmptyShifts => vec![("shift", Type::VARCHAR), ("label", Type::VARCHAR)],
        ResultShape::BookedMembers => {
            vec![("member_id", Type::INT8), ("member_name", Type::VARCHAR)]
        }
        ResultShape::ShiftCatalog => vec![
            ("shift", Type::VARCHAR),
            ("label", Type::VARCHAR),
            ("time_range", Type::VARCHAR),
            ("slots", Type::VARCHAR),
        ],
    }
}

/// Row description for `shape`. Without a requested format (simple query
/// protocol) every column is text.
fn schema(shape: ResultShape, format: Option<&Format>) -> Arc<Vec<FieldInfo>> {
    let fields = columns(shape)
        .into_iter()
        .enumerate()
        .map(|(i, (name, ty))| {
            let field_format = format.map_or(FieldFormat::Text, |f| f.format_for(i));
            FieldInfo::new(name.into(), None, None, ty, field_format)
        })
        .collect();
    Arc::new(fields)
}

fn schema_for(sql: &str, format: Option<&Format>) -> Vec<FieldInfo> {
    sql::describe(sql)
        .map(|shape| Arc::unwrap_or_clone(schema(shape, format)))
        .unwrap_or_default()
}

#[async_trait]
impl SimpleQueryHandler for RotaHandler {
    async fn do_query<C>(
        &self,
        client: &mut C,
        query: &str,
    ) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        if query.trim().trim_end_matches(';').trim().is_empty() {
            return Ok(vec![Response::EmptyQuery]);
        }
        Ok(vec![self.run(client, query, None).await?])
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct RotaQueryParser;

#[async_trait]
impl QueryParser for RotaQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(schema_for(stmt, column_format))
    }
}

#[async_trait]
impl ExtendedQueryHandler for RotaHandler {
    type Statement = String;
    type QueryParser = RotaQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let sql = substitute_params(portal);
        self.run(client, &sql, Some(&portal.result_column_format))
            .await
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            schema_for(&target.statement, None),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(schema_for(
            &target.statement.statement,
            Some(&target.result_column_format),
        )))
    }
}

/// Highest `$N` placeholder number in `sql`.
fn count_params(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    let mut max = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        i += 1;
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if let Ok(n) = sql[start..i].parse::<usize>() {
            max = max.max(n);
        }
    }
    max
}

/// Replace `$1`, `$2`, ... with the bound text values as quoted literals.
/// Higher numbers go first so `$1` never eats the prefix of `$10`.
fn substitute_params(portal: &Portal<String>) -> String {
    let mut sql = portal.statement.statement.clone();
    for (i, param) in portal.parameters.iter().enumerate().rev() {
        let value = match param {
            Some(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                format!("'{}'", text.replace('\'', "''"))
            }
            None => "NULL".to_string(),
        };
        sql = sql.replace(&format!("${}", i + 1), &value);
    }
    sql
}

// ── Factory ──────────────────────────────────────────────────────

pub struct RotaFactory {
    handler: Arc<RotaHandler>,
    auth_handler:
        Arc<CleartextPasswordAuthStartupHandler<RotaAuthSource, DefaultServerParameterProvider>>,
    noop: Arc<NoopHandler>,
}

impl RotaFactory {
    pub fn new(tenant_manager: Arc<TenantManager>, users: Arc<Users>) -> Self {
        let auth_source = RotaAuthSource::new(users.clone());
        Self {
            handler: Arc::new(RotaHandler::new(tenant_manager, users)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                DefaultServerParameterProvider::default(),
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for RotaFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one client connection until it closes.
pub async fn process_connection(
    socket: TcpStream,
    tenant_manager: Arc<TenantManager>,
    users: Arc<Users>,
    tls: Option<TlsAcceptor>,
) -> io::Result<()> {
    let factory = Arc::new(RotaFactory::new(tenant_manager, users));
    pgwire::tokio::process_socket(socket, tls, factory).await
}

// ── Errors ───────────────────────────────────────────────────────

fn user_error(code: &str, message: String) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        message,
    )))
}

/// SQLSTATE reported for a rejected engine call.
fn engine_sqlstate(e: &EngineError) -> &'static str {
    match e {
        EngineError::SlotConflict { .. }
        | EngineError::AssignmentConflict { .. }
        | EngineError::MemberOnLeave(_)
        | EngineError::MemberAlreadyScheduled { .. } => "23P01",
        EngineError::InvalidSlotForShift { .. } => "23514",
        EngineError::MemberNotFound(_) => "23503",
        EngineError::InvalidRange { .. } | EngineError::EmptyRange { .. } => "22008",
        EngineError::InvalidInput(_) => "22023",
        EngineError::LimitExceeded(_) => "54000",
        EngineError::WalError(_) => "58030",
    }
}

fn sql_sqlstate(e: &SqlError) -> &'static str {
    match e {
        SqlError::InvalidValue(..) => "22023",
        SqlError::UnknownTable(_) => "42P01",
        SqlError::UnknownColumn(..) => "42703",
        _ => "42601",
    }
}

fn engine_err(e: EngineError) -> PgWireError {
    user_error(engine_sqlstate(&e), e.to_string())
}

fn sql_err(e: SqlError) -> PgWireError {
    user_error(sql_sqlstate(&e), e.to_string())
}
