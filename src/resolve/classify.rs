use crate::query::{DmlKind, Statement};

/// Statement kind of a lowered statement
pub fn classify(statement: &Statement) -> DmlKind {
    match statement {
        Statement::Select(_) => DmlKind::Select,
        Statement::Insert(_) => DmlKind::Insert,
        Statement::Update(_) => DmlKind::Update,
        Statement::Delete(_) => DmlKind::Delete,
        Statement::Unknown => DmlKind::Unknown
    }
}
