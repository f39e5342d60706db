use std::collections::{BTreeMap, BTreeSet};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{query::DmlKind, resolve::StatementId};

/// CRUD classification of a SQL operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CrudKind {
    #[serde(alias = "create", alias = "insert", alias = "C")]
    Create,
    #[serde(
        alias = "read",
        alias = "select",
        alias = "selectOne",
        alias = "selectList",
        alias = "selectMap",
        alias = "R"
    )]
    Read,
    #[serde(alias = "update", alias = "U")]
    Update,
    #[serde(alias = "delete", alias = "D")]
    Delete,
    #[serde(alias = "unknown")]
    Unknown
}

impl CrudKind {
    /// Single-letter form used in CRUD matrices
    pub fn letter(self) -> char {
        match self {
            Self::Create => 'C',
            Self::Read => 'R',
            Self::Update => 'U',
            Self::Delete => 'D',
            Self::Unknown => '-'
        }
    }
}

impl From<DmlKind> for CrudKind {
    fn from(kind: DmlKind) -> Self {
        match kind {
            DmlKind::Select => Self::Read,
            DmlKind::Insert => Self::Create,
            DmlKind::Update => Self::Update,
            DmlKind::Delete => Self::Delete,
            DmlKind::Unknown => Self::Unknown
        }
    }
}

impl std::fmt::Display for CrudKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// A data-access method and the SQL statement it issues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoMethodRecord {
    pub dao_class:  CompactString,
    pub method:     CompactString,
    pub statement:  StatementId,
    pub crud:       CrudKind,
    #[serde(default)]
    pub parameters: Vec<CompactString>
}

impl DaoMethodRecord {
    /// `DaoClass.method`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.dao_class, self.method)
    }
}

/// A business-logic method with the invocations found in its body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicCallRecord {
    pub logic_class:  CompactString,
    pub logic_method: CompactString,
    /// Invocation targets in source order, as written
    #[serde(default)]
    pub invocations:  SmallVec<[CompactString; 4]>
}

/// One resolved business-operation → table/column fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineageRecord {
    pub logic_class:  CompactString,
    pub logic_method: CompactString,
    /// Invocation text as written in the logic method
    pub invoked:      CompactString,
    pub dao_class:    CompactString,
    pub dao_method:   CompactString,
    pub crud:         CrudKind,
    pub statement:    StatementId,
    pub tables:       BTreeSet<CompactString>,
    pub columns:      BTreeMap<CompactString, BTreeSet<CompactString>>,
    pub parameters:   Vec<CompactString>
}

/// Uniqueness key of a lineage record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineageKey {
    pub logic_class:  CompactString,
    pub logic_method: CompactString,
    pub dao:          String,
    pub statement:    StatementId,
    pub invoked:      CompactString
}

impl LineageRecord {
    pub fn key(&self) -> LineageKey {
        LineageKey {
            logic_class:  self.logic_class.clone(),
            logic_method: self.logic_method.clone(),
            dao:          format!("{}.{}", self.dao_class, self.dao_method),
            statement:    self.statement.clone(),
            invoked:      self.invoked.clone()
        }
    }
}
