use sqlparser::ast::{
    self, AssignmentTarget, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor,
    TableObject, Value, ValueWithSpan,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::config::Role;
use crate::engine::PasteTargets;
use crate::model::*;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertShift {
        date: Date,
        shift: ShiftType,
        member_id: MemberId,
        slot: Option<Slot>,
        assignment: Option<String>,
        returning: bool,
    },
    UpdateShift {
        date: Date,
        shift: ShiftType,
        id: EntryId,
        member_id: Option<MemberId>,
        slot: Option<Option<Slot>>,
        assignment: Option<Option<String>>,
    },
    DeleteShift {
        date: Date,
        shift: ShiftType,
        id: EntryId,
    },
    InsertLeave {
        date: Date,
        member_id: MemberId,
        reason: String,
        returning: bool,
    },
    DeleteLeave {
        date: Date,
        id: EntryId,
    },
    InsertMember {
        name: String,
        returning: bool,
    },
    UpdateMember {
        id: MemberId,
        update: MemberUpdate,
    },
    DeleteMember {
        id: MemberId,
    },
    InsertAssignmentLabels {
        labels: Vec<String>,
    },
    InsertLeaveReasons {
        reasons: Vec<String>,
    },
    Paste {
        source: Date,
        targets: PasteTargets,
    },
    SelectShifts {
        date: Date,
        shift: Option<ShiftType>,
    },
    SelectLeave {
        date: Date,
    },
    SelectSchedules {
        date: Option<Date>,
    },
    SelectMembers {
        active: Option<bool>,
    },
    SelectAssignmentLabels,
    SelectLeaveReasons,
    SelectFreeSlots {
        date: Date,
    },
    SelectEmptyShifts {
        date: Date,
    },
    SelectBookedMembers {
        date: Date,
    },
    SelectShiftCatalog,
}

impl Command {
    /// Lowest role allowed to run this command.
    pub fn required_role(&self) -> Role {
        match self {
            Command::InsertMember { .. }
            | Command::UpdateMember { .. }
            | Command::DeleteMember { .. } => Role::Admin,
            Command::InsertShift { .. }
            | Command::UpdateShift { .. }
            | Command::DeleteShift { .. }
            | Command::InsertLeave { .. }
            | Command::DeleteLeave { .. }
            | Command::InsertAssignmentLabels { .. }
            | Command::InsertLeaveReasons { .. }
            | Command::Paste { .. } => Role::Editor,
            _ => Role::Viewer,
        }
    }
}

/// Row shape a command answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    Shifts,
    Leave,
    Schedules,
    Members,
    AssignmentLabels,
    LeaveReasons,
    FreeSlots,
    EmptyShifts,
    BookedMembers,
    ShiftCatalog,
}

impl ResultShape {
    fn of_table(table: &str) -> Option<Self> {
        Some(match table {
            "shifts" => ResultShape::Shifts,
            "leave" => ResultShape::Leave,
            "schedules" => ResultShape::Schedules,
            "members" => ResultShape::Members,
            "assignments" => ResultShape::AssignmentLabels,
            "leave_reasons" => ResultShape::LeaveReasons,
            "free_slots" => ResultShape::FreeSlots,
            "empty_shifts" => ResultShape::EmptyShifts,
            "booked_members" => ResultShape::BookedMembers,
            "shift_catalog" => ResultShape::ShiftCatalog,
            _ => return None,
        })
    }
}

/// Result shape of a statement that may still hold `$n` placeholders, for
/// describe requests. `None` means the statement returns no rows.
pub fn describe(sql: &str) -> Option<ResultShape> {
    let stmts = Parser::parse_sql(&PostgreSqlDialect {}, sql).ok()?;
    match stmts.first()? {
        Statement::Query(query) => match query.body.as_ref() {
            SetExpr::Select(select) => {
                let table = table_factor_name(&select.from.first()?.relation).ok()?;
                ResultShape::of_table(&table)
            }
            _ => None,
        },
        Statement::Insert(insert) if insert.returning.is_some() => {
            let table = insert_table_name(insert).ok()?;
            ResultShape::of_table(&table)
                .filter(|s| matches!(s, ResultShape::Shifts | ResultShape::Leave | ResultShape::Members))
        }
        _ => None,
    }
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    let Some(stmt) = stmts.first() else {
        return Err(SqlError::Empty);
    };
    if stmts.len() > 1 {
        return Err(SqlError::Unsupported("multiple statements".into()));
    }

    match stmt {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => parse_update(table, assignments, selection.as_ref()),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

// ── INSERT ────────────────────────────────────────────────────

const SHIFT_COLUMNS: &[&str] = &["date", "shift", "member_id", "slot", "assignment"];
const LEAVE_COLUMNS: &[&str] = &["date", "member_id", "reason"];
const MEMBER_COLUMNS: &[&str] = &["name"];
const LABEL_COLUMNS: &[&str] = &["label"];
const REASON_COLUMNS: &[&str] = &["reason"];
const PASTE_COLUMNS: &[&str] = &["source", "target", "start_date", "end_date"];

/// VALUES rows of an INSERT with their column names resolved.
struct InsertRows {
    table: &'static str,
    columns: Vec<String>,
    rows: Vec<Vec<Expr>>,
}

/// One VALUES row, addressed by column name.
struct Row<'a> {
    table: &'static str,
    columns: &'a [String],
    values: &'a [Expr],
}

impl<'a> Row<'a> {
    fn get(&self, column: &str) -> Option<&'a Expr> {
        let i = self.columns.iter().position(|c| c == column)?;
        self.values.get(i)
    }

    fn require(&self, column: &'static str) -> Result<&'a Expr, SqlError> {
        self.get(column).ok_or(SqlError::MissingColumn(self.table, column))
    }
}

impl InsertRows {
    /// Without a column list, values map positionally onto `known`.
    fn new(insert: &ast::Insert, table: &'static str, known: &[&str]) -> Result<Self, SqlError> {
        let rows = extract_all_insert_rows(insert)?;
        let width = rows[0].len();
        let columns: Vec<String> = if insert.columns.is_empty() {
            if width > known.len() {
                return Err(SqlError::WrongArity(table, known.len(), width));
            }
            known[..width].iter().map(|c| c.to_string()).collect()
        } else {
            insert
                .columns
                .iter()
                .map(|c| c.value.to_lowercase())
                .collect()
        };
        if let Some(unknown) = columns.iter().find(|c| !known.contains(&c.as_str())) {
            return Err(SqlError::UnknownColumn(table, unknown.clone()));
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(SqlError::WrongArity(table, columns.len(), bad.len()));
        }
        Ok(Self {
            table,
            columns,
            rows,
        })
    }

    fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row {
            table: self.table,
            columns: &self.columns,
            values,
        })
    }

    fn single(&self) -> Result<Row<'_>, SqlError> {
        if self.rows.len() != 1 {
            return Err(SqlError::Unsupported(format!(
                "{}: insert one row per statement",
                self.table
            )));
        }
        Ok(Row {
            table: self.table,
            columns: &self.columns,
            values: &self.rows[0],
        })
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let returning = insert.returning.is_some();

    match table.as_str() {
        "shifts" => {
            let rows = InsertRows::new(insert, "shifts", SHIFT_COLUMNS)?;
            let row = rows.single()?;
            Ok(Command::InsertShift {
                date: parse_date_expr(row.require("date")?)?,
                shift: parse_shift_expr(row.require("shift")?)?,
                member_id: parse_u32(row.require("member_id")?, "member_id")?,
                slot: row.get("slot").map(parse_slot_expr).transpose()?.flatten(),
                assignment: row
                    .get("assignment")
                    .map(parse_text_or_null)
                    .transpose()?
                    .flatten(),
                returning,
            })
        }
        "leave" => {
            let rows = InsertRows::new(insert, "leave", LEAVE_COLUMNS)?;
            let row = rows.single()?;
            Ok(Command::InsertLeave {
                date: parse_date_expr(row.require("date")?)?,
                member_id: parse_u32(row.require("member_id")?, "member_id")?,
                reason: parse_text(row.require("reason")?, "reason")?,
                returning,
            })
        }
        "members" => {
            let rows = InsertRows::new(insert, "members", MEMBER_COLUMNS)?;
            let row = rows.single()?;
            Ok(Command::InsertMember {
                name: parse_text(row.require("name")?, "name")?,
                returning,
            })
        }
        "assignments" => {
            let rows = InsertRows::new(insert, "assignments", LABEL_COLUMNS)?;
            let labels = rows
                .rows()
                .map(|row| parse_text(row.require("label")?, "label"))
                .collect::<Result<_, _>>()?;
            Ok(Command::InsertAssignmentLabels { labels })
        }
        "leave_reasons" => {
            let rows = InsertRows::new(insert, "leave_reasons", REASON_COLUMNS)?;
            let reasons = rows
                .rows()
                .map(|row| parse_text(row.require("reason")?, "reason"))
                .collect::<Result<_, _>>()?;
            Ok(Command::InsertLeaveReasons { reasons })
        }
        "pastes" => parse_paste(&InsertRows::new(insert, "pastes", PASTE_COLUMNS)?),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

/// `(source, target)` rows list explicit targets; a single
/// `(source, start_date, end_date)` row pastes onto a weekday range.
fn parse_paste(rows: &InsertRows) -> Result<Command, SqlError> {
    let mut source = None;
    let mut dates = Vec::new();
    for row in rows.rows() {
        let row_source = parse_date_expr(row.require("source")?)?;
        if source.is_some_and(|s| s != row_source) {
            return Err(SqlError::Unsupported(
                "pastes: all rows must share one source".into(),
            ));
        }
        source = Some(row_source);

        if let Some(target) = row.get("target") {
            dates.push(parse_date_expr(target)?);
            continue;
        }
        let start = parse_date_expr(row.require("start_date")?)?;
        let end = parse_date_expr(row.require("end_date")?)?;
        if rows.rows.len() != 1 {
            return Err(SqlError::Unsupported(
                "pastes: a date range takes a single row".into(),
            ));
        }
        return Ok(Command::Paste {
            source: row_source,
            targets: PasteTargets::Weekdays { start, end },
        });
    }
    let source = source.ok_or(SqlError::MissingColumn("pastes", "source"))?;
    Ok(Command::Paste {
        source,
        targets: PasteTargets::Dates(dates),
    })
}

// ── UPDATE ────────────────────────────────────────────────────

fn parse_update(
    table: &ast::TableWithJoins,
    assignments: &[ast::Assignment],
    selection: Option<&Expr>,
) -> Result<Command, SqlError> {
    let name = table_factor_name(&table.relation)?;
    let filters = Filters::from_selection(selection)?;
    let mut sets = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let column = match &assignment.target {
            AssignmentTarget::ColumnName(name) => object_name_last(name)
                .ok_or_else(|| SqlError::Parse("empty column name".into()))?,
            AssignmentTarget::Tuple(_) => {
                return Err(SqlError::Unsupported("tuple assignment".into()));
            }
        };
        sets.push((column, &assignment.value));
    }

    match name.as_str() {
        "shifts" => {
            let (mut member_id, mut slot, mut assignment) = (None, None, None);
            for (column, value) in sets {
                match column.as_str() {
                    "member_id" => member_id = Some(parse_u32(value, "member_id")?),
                    "slot" => slot = Some(parse_slot_expr(value)?),
                    "assignment" => assignment = Some(parse_text_or_null(value)?),
                    _ => return Err(SqlError::UnknownColumn("shifts", column)),
                }
            }
            Ok(Command::UpdateShift {
                date: parse_date_expr(filters.require("date")?)?,
                shift: parse_shift_expr(filters.require("shift")?)?,
                id: parse_u32(filters.require("id")?, "id")?,
                member_id,
                slot,
                assignment,
            })
        }
        "members" => {
            let mut update = MemberUpdate::default();
            for (column, value) in sets {
                match column.as_str() {
                    "name" => update.name = Some(parse_text(value, "name")?),
                    "active" => update.active = Some(parse_bool(value, "active")?),
                    _ => return Err(SqlError::UnknownColumn("members", column)),
                }
            }
            Ok(Command::UpdateMember {
                id: parse_u32(filters.require("id")?, "id")?,
                update,
            })
        }
        _ => Err(SqlError::UnknownTable(name)),
    }
}

// ── DELETE ────────────────────────────────────────────────────

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;
    let filters = Filters::from_selection(delete.selection.as_ref())?;

    match table.as_str() {
        "shifts" => Ok(Command::DeleteShift {
            date: parse_date_expr(filters.require("date")?)?,
            shift: parse_shift_expr(filters.require("shift")?)?,
            id: parse_u32(filters.require("id")?, "id")?,
        }),
        "leave" => Ok(Command::DeleteLeave {
            date: parse_date_expr(filters.require("date")?)?,
            id: parse_u32(filters.require("id")?, "id")?,
        }),
        "members" => Ok(Command::DeleteMember {
            id: parse_u32(filters.require("id")?, "id")?,
        }),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

// ── SELECT ────────────────────────────────────────────────────

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    let Some(from) = select.from.first() else {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    };
    let table = table_factor_name(&from.relation)?;
    let filters = Filters::from_selection(select.selection.as_ref())?;
    let date = || parse_date_expr(filters.require("date")?);

    match table.as_str() {
        "shifts" => Ok(Command::SelectShifts {
            date: date()?,
            shift: filters.get("shift").map(parse_shift_expr).transpose()?,
        }),
        "leave" => Ok(Command::SelectLeave { date: date()? }),
        "schedules" => Ok(Command::SelectSchedules {
            date: filters.get("date").map(parse_date_expr).transpose()?,
        }),
        "members" => Ok(Command::SelectMembers {
            active: filters
                .get("active")
                .map(|e| parse_bool(e, "active"))
                .transpose()?,
        }),
        "assignments" => Ok(Command::SelectAssignmentLabels),
        "leave_reasons" => Ok(Command::SelectLeaveReasons),
        "free_slots" => Ok(Command::SelectFreeSlots { date: date()? }),
        "empty_shifts" => Ok(Command::SelectEmptyShifts { date: date()? }),
        "booked_members" => Ok(Command::SelectBookedMembers { date: date()? }),
        "shift_catalog" => Ok(Command::SelectShiftCatalog),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

/// `column = value` conditions joined by AND.
struct Filters<'a>(Vec<(String, &'a Expr)>);

impl<'a> Filters<'a> {
    fn from_selection(selection: Option<&'a Expr>) -> Result<Self, SqlError> {
        let mut filters = Filters(Vec::new());
        if let Some(expr) = selection {
            filters.collect(expr)?;
        }
        Ok(filters)
    }

    fn collect(&mut self, expr: &'a Expr) -> Result<(), SqlError> {
        match expr {
            Expr::Nested(inner) => self.collect(inner),
            Expr::BinaryOp {
                left,
                op: ast::BinaryOperator::And,
                right,
            } => {
                self.collect(left)?;
                self.collect(right)
            }
            Expr::BinaryOp {
                left,
                op: ast::BinaryOperator::Eq,
                right,
            } => {
                let column = expr_column_name(left)
                    .ok_or_else(|| SqlError::Unsupported(format!("filter on {left}")))?;
                self.0.push((column, right));
                Ok(())
            }
            other => Err(SqlError::Unsupported(format!(
                "filter {other} (only column = value joined by AND)"
            ))),
        }
    }

    fn get(&self, column: &str) -> Option<&'a Expr> {
        self.0.iter().find(|(c, _)| c == column).map(|(_, e)| *e)
    }

    fn require(&self, column: &'static str) -> Result<&'a Expr, SqlError> {
        self.get(column).ok_or(SqlError::MissingFilter(column))
    }
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    match tables_with_joins.first() {
        Some(first) => table_factor_name(&first.relation),
        None => Err(SqlError::Parse("DELETE without table".into())),
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_all_insert_rows(insert: &ast::Insert) -> Result<Vec<Vec<Expr>>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => {
            if values.rows.is_empty() {
                return Err(SqlError::Parse("empty VALUES".into()));
            }
            Ok(values.rows.clone())
        }
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

/// The literal behind an expression, looking through parentheses and casts
/// such as `'2026-02-01'::date`.
fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        Expr::Nested(inner) | Expr::Cast { expr: inner, .. } => extract_value(inner),
        _ => None,
    }
}

fn literal<'a>(expr: &'a Expr, column: &'static str) -> Result<&'a Value, SqlError> {
    extract_value(expr).ok_or_else(|| SqlError::InvalidValue(column, expr.to_string()))
}

fn parse_text(expr: &Expr, column: &'static str) -> Result<String, SqlError> {
    match literal(expr, column)? {
        Value::SingleQuotedString(s) => Ok(s.clone()),
        other => Err(SqlError::InvalidValue(column, other.to_string())),
    }
}

fn parse_text_or_null(expr: &Expr) -> Result<Option<String>, SqlError> {
    match literal(expr, "assignment")? {
        Value::Null => Ok(None),
        Value::SingleQuotedString(s) => Ok(Some(s.clone())),
        other => Err(SqlError::InvalidValue("assignment", other.to_string())),
    }
}

fn parse_date_expr(expr: &Expr) -> Result<Date, SqlError> {
    let text = parse_text(expr, "date")?;
    parse_date(&text).ok_or(SqlError::InvalidValue("date", text))
}

fn parse_shift_expr(expr: &Expr) -> Result<ShiftType, SqlError> {
    let text = parse_text(expr, "shift")?;
    text.parse()
        .map_err(|_| SqlError::InvalidValue("shift", text.clone()))
}

fn parse_u32(expr: &Expr, column: &'static str) -> Result<u32, SqlError> {
    let raw = match literal(expr, column)? {
        Value::Number(s, _) | Value::SingleQuotedString(s) => s,
        other => return Err(SqlError::InvalidValue(column, other.to_string())),
    };
    raw.trim()
        .parse()
        .map_err(|_| SqlError::InvalidValue(column, raw.clone()))
}

/// `NULL` clears the slot; anything else must be 1 to 6.
fn parse_slot_expr(expr: &Expr) -> Result<Option<Slot>, SqlError> {
    if matches!(extract_value(expr), Some(Value::Null)) {
        return Ok(None);
    }
    let n = parse_u32(expr, "slot")?;
    u8::try_from(n)
        .ok()
        .and_then(Slot::new)
        .map(Some)
        .ok_or(SqlError::InvalidValue("slot", n.to_string()))
}

fn parse_bool(expr: &Expr, column: &'static str) -> Result<bool, SqlError> {
    match literal(expr, column)? {
        Value::Boolean(b) => Ok(*b),
        Value::SingleQuotedString(s) => match s.to_lowercase().as_str() {
            "true" | "t" | "1" => Ok(true),
            "false" | "f" | "0" => Ok(false),
            _ => Err(SqlError::InvalidValue(column, s.clone())),
        },
        Value::Number(n, _) => Ok(n != "0"),
        other => Err(SqlError::InvalidValue(column, other.to_string())),
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    UnknownColumn(&'static str, String),
    WrongArity(&'static str, usize, usize),
    MissingColumn(&'static str, &'static str),
    MissingFilter(&'static str),
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::UnknownColumn(t, c) => write!(f, "{t}: unknown column {c}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingColumn(t, c) => write!(f, "{t}: missing value for {c}"),
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
            SqlError::InvalidValue(col, v) => write!(f, "invalid value for {col}: {v}"),
        }
    }
}

impl std::error::Error for SqlError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> Date {
        parse_date(s).unwrap()
    }

    #[test]
    fn parse_insert_shift_with_columns() {
        let sql = "INSERT INTO shifts (date, shift, member_id, slot, assignment) \
                   VALUES ('2026-02-01', 'JPN', 6, 1, 'M1') RETURNING *";
        let cmd = parse_sql(sql).unwrap();
        assert_eq!(
            cmd,
            Command::InsertShift {
                date: date("2026-02-01"),
                shift: ShiftType::Jpn,
                member_id: 6,
                slot: Slot::new(1),
                assignment: Some("M1".into()),
                returning: true,
            }
        );
    }

    #[test]
    fn parse_insert_shift_positional_prefix() {
        let sql = "INSERT INTO shifts VALUES ('2026-02-01', 'cet_early', 8)";
        match parse_sql(sql).unwrap() {
            Command::InsertShift {
                shift,
                slot,
                assignment,
                returning,
                ..
            } => {
                assert_eq!(shift, ShiftType::CetEarly);
                assert_eq!(slot, None);
                assert_eq!(assignment, None);
                assert!(!returning);
            }
            other => panic!("expected InsertShift, got {other:?}"),
        }
    }

    #[test]
    fn parse_insert_shift_quoted_numbers_and_nulls() {
        // Extended-protocol parameters arrive as quoted text.
        let sql = "INSERT INTO shifts (date, shift, member_id, slot, assignment) \
                   VALUES ('2026-02-01', 'IST', '8', NULL, NULL)";
        match parse_sql(sql).unwrap() {
            Command::InsertShift {
                member_id, slot, ..
            } => {
                assert_eq!(member_id, 8);
                assert_eq!(slot, None);
            }
            other => panic!("expected InsertShift, got {other:?}"),
        }
    }

    #[test]
    fn slot_out_of_range_is_invalid_value() {
        let sql = "INSERT INTO shifts VALUES ('2026-02-01', 'JPN', 6, 7)";
        assert_eq!(
            parse_sql(sql).unwrap_err(),
            SqlError::InvalidValue("slot", "7".into())
        );
    }

    #[test]
    fn bad_date_and_shift_are_invalid_values() {
        let sql = "INSERT INTO shifts VALUES ('2026-02-30', 'JPN', 6)";
        assert!(matches!(parse_sql(sql), Err(SqlError::InvalidValue("date", _))));
        let sql = "INSERT INTO shifts VALUES ('2026-02-01', 'APAC', 6)";
        assert!(matches!(parse_sql(sql), Err(SqlError::InvalidValue("shift", _))));
    }

    #[test]
    fn unknown_column_is_rejected() {
        let sql = "INSERT INTO shifts (date, shift, member_id, colour) VALUES ('2026-02-01', 'JPN', 6, 'red')";
        assert_eq!(
            parse_sql(sql).unwrap_err(),
            SqlError::UnknownColumn("shifts", "colour".into())
        );
    }

    #[test]
    fn missing_required_column() {
        let sql = "INSERT INTO shifts (date, shift) VALUES ('2026-02-01', 'JPN')";
        assert_eq!(
            parse_sql(sql).unwrap_err(),
            SqlError::MissingColumn("shifts", "member_id")
        );
    }

    #[test]
    fn parse_update_shift() {
        let sql = "UPDATE shifts SET slot = NULL, assignment = 'M3' \
                   WHERE date = '2026-02-01' AND shift = 'JPN' AND id = 2";
        assert_eq!(
            parse_sql(sql).unwrap(),
            Command::UpdateShift {
                date: date("2026-02-01"),
                shift: ShiftType::Jpn,
                id: 2,
                member_id: None,
                slot: Some(None),
                assignment: Some(Some("M3".into())),
            }
        );
    }

    #[test]
    fn update_without_key_filters_fails() {
        let sql = "UPDATE shifts SET slot = 2 WHERE date = '2026-02-01'";
        assert_eq!(parse_sql(sql).unwrap_err(), SqlError::MissingFilter("shift"));
    }

    #[test]
    fn parse_delete_shift_and_leave() {
        let cmd = parse_sql("DELETE FROM shifts WHERE date = '2026-02-01' AND shift = 'US_LATE' AND id = 4").unwrap();
        assert_eq!(
            cmd,
            Command::DeleteShift {
                date: date("2026-02-01"),
                shift: ShiftType::UsLate,
                id: 4
            }
        );
        let cmd = parse_sql("DELETE FROM leave WHERE (date = '2026-02-01') AND id = 1").unwrap();
        assert_eq!(
            cmd,
            Command::DeleteLeave {
                date: date("2026-02-01"),
                id: 1
            }
        );
    }

    #[test]
    fn parse_insert_leave() {
        let sql = "INSERT INTO leave (date, member_id, reason) VALUES ('2026-02-01', 1, 'Training')";
        assert_eq!(
            parse_sql(sql).unwrap(),
            Command::InsertLeave {
                date: date("2026-02-01"),
                member_id: 1,
                reason: "Training".into(),
                returning: false,
            }
        );
    }

    #[test]
    fn parse_member_commands() {
        assert_eq!(
            parse_sql("INSERT INTO members (name) VALUES ('Xavier Pearl') RETURNING id").unwrap(),
            Command::InsertMember {
                name: "Xavier Pearl".into(),
                returning: true
            }
        );
        assert_eq!(
            parse_sql("UPDATE members SET active = false WHERE id = 3").unwrap(),
            Command::UpdateMember {
                id: 3,
                update: MemberUpdate {
                    name: None,
                    active: Some(false)
                }
            }
        );
        assert_eq!(
            parse_sql("DELETE FROM members WHERE id = 3").unwrap(),
            Command::DeleteMember { id: 3 }
        );
        assert!(matches!(
            parse_sql("UPDATE members SET role = 'x' WHERE id = 3"),
            Err(SqlError::UnknownColumn("members", _))
        ));
    }

    #[test]
    fn parse_catalog_inserts_take_many_rows() {
        assert_eq!(
            parse_sql("INSERT INTO assignments (label) VALUES ('M6'), ('M7')").unwrap(),
            Command::InsertAssignmentLabels {
                labels: vec!["M6".into(), "M7".into()]
            }
        );
        assert_eq!(
            parse_sql("INSERT INTO leave_reasons VALUES ('Conference')").unwrap(),
            Command::InsertLeaveReasons {
                reasons: vec!["Conference".into()]
            }
        );
    }

    #[test]
    fn parse_paste_explicit_targets() {
        let sql = "INSERT INTO pastes (source, target) VALUES \
                   ('2026-01-19', '2026-02-02'), ('2026-01-19', '2026-02-03')";
        assert_eq!(
            parse_sql(sql).unwrap(),
            Command::Paste {
                source: date("2026-01-19"),
                targets: PasteTargets::Dates(vec![date("2026-02-02"), date("2026-02-03")]),
            }
        );
    }

    #[test]
    fn parse_paste_range() {
        let sql = "INSERT INTO pastes (source, start_date, end_date) \
                   VALUES ('2026-01-19', '2026-02-02', '2026-02-06')";
        assert_eq!(
            parse_sql(sql).unwrap(),
            Command::Paste {
                source: date("2026-01-19"),
                targets: PasteTargets::Weekdays {
                    start: date("2026-02-02"),
                    end: date("2026-02-06")
                },
            }
        );
    }

    #[test]
    fn paste_rows_must_share_source() {
        let sql = "INSERT INTO pastes (source, target) VALUES \
                   ('2026-01-19', '2026-02-02'), ('2026-01-20', '2026-02-03')";
        assert!(matches!(parse_sql(sql), Err(SqlError::Unsupported(_))));
    }

    #[test]
    fn parse_selects() {
        assert_eq!(
            parse_sql("SELECT * FROM shifts WHERE date = '2026-01-19'").unwrap(),
            Command::SelectShifts {
                date: date("2026-01-19"),
                shift: None
            }
        );
        assert_eq!(
            parse_sql("SELECT * FROM shifts WHERE date = '2026-01-19' AND shift = 'IST'").unwrap(),
            Command::SelectShifts {
                date: date("2026-01-19"),
                shift: Some(ShiftType::Ist)
            }
        );
        assert_eq!(
            parse_sql("SELECT * FROM schedules").unwrap(),
            Command::SelectSchedules { date: None }
        );
        assert_eq!(
            parse_sql("SELECT * FROM members WHERE active = true").unwrap(),
            Command::SelectMembers { active: Some(true) }
        );
        assert_eq!(
            parse_sql("SELECT * FROM free_slots WHERE date = '2026-01-19'::date").unwrap(),
            Command::SelectFreeSlots {
                date: date("2026-01-19")
            }
        );
        assert_eq!(
            parse_sql("SELECT * FROM shift_catalog").unwrap(),
            Command::SelectShiftCatalog
        );
        assert_eq!(
            parse_sql("SELECT * FROM leave").unwrap_err(),
            SqlError::MissingFilter("date")
        );
    }

    #[test]
    fn or_filters_are_unsupported() {
        let sql = "SELECT * FROM shifts WHERE date = '2026-01-19' OR date = '2026-01-20'";
        assert!(matches!(parse_sql(sql), Err(SqlError::Unsupported(_))));
    }

    #[test]
    fn roles_required() {
        let read = parse_sql("SELECT * FROM assignments").unwrap();
        assert_eq!(read.required_role(), Role::Viewer);
        let write = parse_sql("DELETE FROM leave WHERE date = '2026-02-01' AND id = 1").unwrap();
        assert_eq!(write.required_role(), Role::Editor);
        let roster = parse_sql("INSERT INTO members (name) VALUES ('A')").unwrap();
        assert_eq!(roster.required_role(), Role::Admin);
    }

    #[test]
    fn describe_placeholder_statements() {
        assert_eq!(
            describe("SELECT * FROM shifts WHERE date = $1"),
            Some(ResultShape::Shifts)
        );
        assert_eq!(
            describe("INSERT INTO members (name) VALUES ($1) RETURNING *"),
            Some(ResultShape::Members)
        );
        assert_eq!(describe("INSERT INTO members (name) VALUES ($1)"), None);
        assert_eq!(describe("DELETE FROM members WHERE id = $1"), None);
        assert_eq!(describe("SELECT * FROM nowhere"), None);
    }

    #[test]
    fn parse_unknown_table_errors() {
        assert!(matches!(
            parse_sql("SELECT * FROM bookings"),
            Err(SqlError::UnknownTable(_))
        ));
    }

    #[test]
    fn parse_empty_errors() {
        assert!(matches!(parse_sql(""), Err(SqlError::Empty)));
    }
}
