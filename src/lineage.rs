//! Cross-layer lineage joining.
//!
//! Stitches logic method → DAO method → SQL statement records, produced by
//! independent analyses, into [`LineageRecord`]s.
//!
//! - An invocation matching several DAO methods yields one record per match.
//! - An invocation matching none yields no record and one `UnresolvedCall`
//!   diagnostic.
//! - A DAO method whose statement was never resolved still yields a record,
//!   with empty tables and columns, plus one `MissingSqlStatement` diagnostic
//!   per (DAO method, statement).
//!
//! Output is deduplicated by [`LineageKey`] and sorted, so it does not depend
//! on worker completion order.

mod normalize;
pub mod types;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use compact_str::CompactString;
pub use normalize::normalize_invocation;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;
pub use types::{CrudKind, DaoMethodRecord, LineageKey, LineageRecord, LogicCallRecord};

use crate::{
    diagnostics::{AmbiguityReporter, Diagnostic, DiagnosticKind},
    resolve::{ParsedStatement, StatementId}
};

/// Lineage records with the diagnostics raised while joining
#[derive(Debug, Clone, Default, Serialize)]
pub struct LineageOutput {
    pub records:     Vec<LineageRecord>,
    pub diagnostics: AmbiguityReporter
}

/// Joins logic calls, DAO methods and resolved statements
#[derive(Debug)]
pub struct CrudLineageJoiner<'a> {
    daos:       HashMap<&'a str, Vec<&'a DaoMethodRecord>>,
    statements: &'a BTreeMap<StatementId, ParsedStatement>,
    by_bare_id: HashMap<&'a str, Vec<&'a StatementId>>,
    parameters: Option<&'a BTreeMap<StatementId, Vec<CompactString>>>
}

impl<'a> CrudLineageJoiner<'a> {
    pub fn new(
        daos: &'a [DaoMethodRecord],
        statements: &'a BTreeMap<StatementId, ParsedStatement>
    ) -> Self {
        let mut by_method: HashMap<&str, Vec<&DaoMethodRecord>> = HashMap::new();
        for dao in daos {
            by_method.entry(dao.method.as_str()).or_default().push(dao);
        }
        let mut by_bare_id: HashMap<&str, Vec<&StatementId>> = HashMap::new();
        for id in statements.keys() {
            by_bare_id.entry(id.id.as_str()).or_default().push(id);
        }
        Self {
            daos: by_method,
            statements,
            by_bare_id,
            parameters: None
        }
    }

    /// Parameter names found in the SQL text, used for DAO records that
    /// declare none
    #[must_use]
    pub fn with_parameters(mut self, parameters: &'a BTreeMap<StatementId, Vec<CompactString>>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// DAO methods whose name matches the normalized invocation
    pub fn candidates(&self, invocation: &str) -> &[&'a DaoMethodRecord] {
        self.daos
            .get(normalize_invocation(invocation).as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn join(&self, logic: &[LogicCallRecord]) -> LineageOutput {
        let partials: Vec<(Vec<LineageRecord>, Vec<Diagnostic>, Vec<(String, StatementId)>)> = logic
            .par_iter()
            .map(|record| self.join_one(record))
            .collect();

        let mut records = BTreeMap::new();
        let mut diagnostics = AmbiguityReporter::new();
        let mut missing = BTreeSet::new();
        for (found, unresolved, absent) in partials {
            for record in found {
                records.entry(record.key()).or_insert(record);
            }
            diagnostics.extend(unresolved);
            missing.extend(absent);
        }
        for (dao, statement) in missing {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::MissingSqlStatement,
                    format!("{} points at '{}', which was not resolved", dao, statement)
                )
                .with_statement(statement.to_string())
                .with_subject(dao)
            );
        }

        debug!(
            records = records.len(),
            diagnostics = diagnostics.len(),
            "joined lineage"
        );

        LineageOutput {
            records: records.into_values().collect(),
            diagnostics
        }
    }

    fn join_one(
        &self,
        logic: &LogicCallRecord
    ) -> (Vec<LineageRecord>, Vec<Diagnostic>, Vec<(String, StatementId)>) {
        let mut records = Vec::new();
        let mut unresolved = Vec::new();
        let mut missing = Vec::new();
        for invocation in &logic.invocations {
            let candidates = self.candidates(invocation);
            if candidates.is_empty() {
                unresolved.push(
                    Diagnostic::new(
                        DiagnosticKind::UnresolvedCall,
                        format!(
                            "{}.{} calls '{}', which matches no DAO method",
                            logic.logic_class, logic.logic_method, invocation
                        )
                    )
                    .with_subject(invocation.clone())
                );
                continue;
            }
            for dao in candidates {
                let statements = self.statements_for(&dao.statement);
                if statements.is_empty() {
                    missing.push((dao.qualified_name(), dao.statement.clone()));
                    records.push(self.record(logic, invocation, dao, dao.statement.clone(), None));
                    continue;
                }
                for (id, parsed) in statements {
                    records.push(self.record(logic, invocation, dao, id.clone(), Some(parsed)));
                }
            }
        }
        (records, unresolved, missing)
    }

    /// Statements behind a DAO reference; an empty namespace matches every
    /// statement with the same bare id
    fn statements_for(&self, id: &StatementId) -> Vec<(&'a StatementId, &'a ParsedStatement)> {
        if id.has_namespace() {
            return self.statements.get_key_value(id).into_iter().collect();
        }
        self.by_bare_id
            .get(id.id.as_str())
            .into_iter()
            .flatten()
            .filter_map(|key| self.statements.get_key_value(*key))
            .collect()
    }

    fn record(
        &self,
        logic: &LogicCallRecord,
        invocation: &CompactString,
        dao: &DaoMethodRecord,
        statement: StatementId,
        parsed: Option<&ParsedStatement>
    ) -> LineageRecord {
        let parameters = if dao.parameters.is_empty() {
            self.parameters
                .and_then(|p| p.get(&statement))
                .cloned()
                .unwrap_or_default()
        } else {
            dao.parameters.clone()
        };
        LineageRecord {
            logic_class: logic.logic_class.clone(),
            logic_method: logic.logic_method.clone(),
            invoked: invocation.clone(),
            dao_class: dao.dao_class.clone(),
            dao_method: dao.method.clone(),
            crud: dao.crud,
            statement,
            tables: parsed.map(|p| p.tables.clone()).unwrap_or_default(),
            columns: parsed.map(|p| p.columns.clone()).unwrap_or_default(),
            parameters
        }
    }
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;

    use super::*;
    use crate::query::DmlKind;

    fn dao(class: &str, method: &str, ns: &str, id: &str) -> DaoMethodRecord {
        DaoMethodRecord {
            dao_class:  class.into(),
            method:     method.into(),
            statement:  StatementId::new(ns, id),
            crud:       CrudKind::Read,
            parameters: vec!["id".into()]
        }
    }

    fn users_statement() -> ParsedStatement {
        let mut stmt = ParsedStatement::empty(DmlKind::Select);
        stmt.tables.insert("users".into());
        stmt.columns
            .entry("users".into())
            .or_default()
            .insert("id".into());
        stmt
    }

    fn logic(invocations: &[&str]) -> LogicCallRecord {
        LogicCallRecord {
            logic_class:  "UserLogic".into(),
            logic_method: "fetchUserById".into(),
            invocations:  invocations.iter().map(|s| CompactString::from(*s)).collect()
        }
    }

    #[test]
    fn test_single_match_joins_all_four() {
        let daos = vec![dao("userDao", "getUserById", "UserMapper", "selectById")];
        let statements =
            BTreeMap::from([(StatementId::new("UserMapper", "selectById"), users_statement())]);
        let out = CrudLineageJoiner::new(&daos, &statements).join(&[logic(&["userDao.getUserById"])]);
        assert_eq!(out.records.len(), 1);
        let record = &out.records[0];
        assert_eq!(record.logic_method, "fetchUserById");
        assert_eq!(record.dao_method, "getUserById");
        assert_eq!(record.crud, CrudKind::Read);
        assert_eq!(record.statement.to_string(), "UserMapper.selectById");
        assert!(record.tables.contains("users"));
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_unmatched_invocation_is_reported_not_emitted() {
        let daos = vec![dao("userDao", "getUserById", "UserMapper", "selectById")];
        let statements = BTreeMap::new();
        let out = CrudLineageJoiner::new(&daos, &statements).join(&[logic(&["mailer.send"])]);
        assert!(out.records.is_empty());
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics.count_of(DiagnosticKind::UnresolvedCall), 1);
    }

    #[test]
    fn test_overloaded_name_yields_record_per_match() {
        let daos = vec![
            dao("UserDao", "find", "UserMapper", "find"),
            dao("OrderDao", "find", "OrderMapper", "find"),
        ];
        let statements = BTreeMap::from([
            (StatementId::new("UserMapper", "find"), users_statement()),
            (StatementId::new("OrderMapper", "find"), users_statement()),
        ]);
        let out = CrudLineageJoiner::new(&daos, &statements).join(&[logic(&["dao.find(id)"])]);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].dao_class, "OrderDao");
        assert_eq!(out.records[1].dao_class, "UserDao");
    }

    #[test]
    fn test_missing_statement_keeps_record() {
        let daos = vec![dao("userDao", "getUserById", "UserMapper", "selectById")];
        let statements = BTreeMap::new();
        let calls = [logic(&["userDao.getUserById", "this.userDao.getUserById(7)"])];
        let out = CrudLineageJoiner::new(&daos, &statements).join(&calls);
        assert_eq!(out.records.len(), 2);
        assert!(out.records.iter().all(|r| r.tables.is_empty()));
        assert_eq!(out.diagnostics.count_of(DiagnosticKind::MissingSqlStatement), 1);
    }

    #[test]
    fn test_bare_statement_id_matches_any_namespace() {
        let daos = vec![dao("userDao", "selectAll", "", "selectAll")];
        let statements = BTreeMap::from([
            (StatementId::new("A", "selectAll"), users_statement()),
            (StatementId::new("B", "selectAll"), users_statement()),
        ]);
        let out = CrudLineageJoiner::new(&daos, &statements).join(&[logic(&["selectAll"])]);
        assert_eq!(out.records.len(), 2);
    }

    #[test]
    fn test_duplicate_invocations_collapse() {
        let daos = vec![dao("userDao", "getUserById", "UserMapper", "selectById")];
        let statements =
            BTreeMap::from([(StatementId::new("UserMapper", "selectById"), users_statement())]);
        let record = LogicCallRecord {
            logic_class:  "UserLogic".into(),
            logic_method: "fetch".into(),
            invocations:  smallvec!["getUserById".into(), "getUserById".into()]
        };
        let out = CrudLineageJoiner::new(&daos, &statements).join(&[record.clone(), record]);
        assert_eq!(out.records.len(), 1);
    }

    #[test]
    fn test_parameters_fall_back_to_sql_text() {
        let mut record = dao("userDao", "getUserById", "UserMapper", "selectById");
        record.parameters.clear();
        let daos = vec![record];
        let id = StatementId::new("UserMapper", "selectById");
        let statements = BTreeMap::from([(id.clone(), users_statement())]);
        let params = BTreeMap::from([(id, vec![CompactString::from("userId")])]);
        let out = CrudLineageJoiner::new(&daos, &statements)
            .with_parameters(&params)
            .join(&[logic(&["getUserById"])]);
        assert_eq!(out.records[0].parameters, vec![CompactString::from("userId")]);
    }
}
