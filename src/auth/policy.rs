use sqlx::{QueryBuilder, Sqlite};
use std::fmt;
use uuid::Uuid;

/// The identity a statement is executed on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Authenticated(Uuid),
    /// Platform-level access that bypasses row policies. Used for identity
    /// registration and account deletion.
    Service,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Authenticated(id) => write!(f, "identity:{}", id),
            Actor::Service => write!(f, "service"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Select,
    Insert,
    Update,
    Delete,
}

/// A column value a predicate can be evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnValue {
    Id(Uuid),
    Flag(bool),
}

/// Exposes the columns of a candidate row to WITH CHECK evaluation.
pub trait PolicyRow {
    fn column(&self, name: &str) -> Option<ColumnValue>;
}

/// Boolean expression over row columns.
///
/// The same predicate is rendered into SQL to filter which rows a statement
/// can reach, and evaluated in process against a row that is about to be
/// written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Allow,
    Deny,
    Equals(&'static str, Uuid),
    IsTrue(&'static str),
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Predicate::Allow => {
                qb.push("1 = 1");
            }
            Predicate::Deny => {
                qb.push("1 = 0");
            }
            Predicate::Equals(column, id) => {
                qb.push(*column).push(" = ").push_bind(*id);
            }
            Predicate::IsTrue(column) => {
                qb.push(*column).push(" = 1");
            }
            Predicate::Any(predicates) => {
                if predicates.is_empty() {
                    qb.push("1 = 0");
                    return;
                }
                qb.push("(");
                for (i, predicate) in predicates.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    predicate.push_sql(qb);
                }
                qb.push(")");
            }
        }
    }

    pub fn matches(&self, row: &impl PolicyRow) -> bool {
        match self {
            Predicate::Allow => true,
            Predicate::Deny => false,
            Predicate::Equals(column, id) => row.column(column) == Some(ColumnValue::Id(*id)),
            Predicate::IsTrue(column) => row.column(column) == Some(ColumnValue::Flag(true)),
            Predicate::Any(predicates) => predicates.iter().any(|p| p.matches(row)),
        }
    }
}

/// Per-table access rules for authenticated identities.
///
/// Anything a policy does not grant is denied. `Actor::Service` is never
/// passed to these methods; see [`filter_for`] and [`check_for`].
pub trait RowPolicy {
    const TABLE: &'static str;

    fn select(_actor: Uuid) -> Predicate {
        Predicate::Deny
    }

    fn insert_check(_actor: Uuid) -> Predicate {
        Predicate::Deny
    }

    fn update_using(_actor: Uuid) -> Predicate {
        Predicate::Deny
    }

    fn update_check(_actor: Uuid) -> Predicate {
        Predicate::Deny
    }

    fn delete_using(_actor: Uuid) -> Predicate {
        Predicate::Deny
    }
}

/// USING predicate: which existing rows `actor` may reach with `action`.
pub fn filter_for<P: RowPolicy>(actor: &Actor, action: Action) -> Predicate {
    let id = match actor {
        Actor::Service => return Predicate::Allow,
        Actor::Authenticated(id) => *id,
    };

    match action {
        Action::Select => P::select(id),
        Action::Update => P::update_using(id),
        Action::Delete => P::delete_using(id),
        // Inserts have no existing row to filter.
        Action::Insert => Predicate::Allow,
    }
}

/// WITH CHECK predicate: whether a row produced by `action` may be written.
pub fn check_for<P: RowPolicy>(actor: &Actor, action: Action) -> Predicate {
    let id = match actor {
        Actor::Service => return Predicate::Allow,
        Actor::Authenticated(id) => *id,
    };

    match action {
        Action::Insert => P::insert_check(id),
        Action::Update => P::update_check(id),
        Action::Select | Action::Delete => Predicate::Allow,
    }
}

pub struct ProfilePolicy;

impl RowPolicy for ProfilePolicy {
    const TABLE: &'static str = "profiles";

    fn select(_actor: Uuid) -> Predicate {
        Predicate::Allow
    }

    fn update_using(actor: Uuid) -> Predicate {
        Predicate::Equals("id", actor)
    }

    fn update_check(actor: Uuid) -> Predicate {
        Predicate::Equals("id", actor)
    }
}

pub struct MentorPolicy;

impl RowPolicy for MentorPolicy {
    const TABLE: &'static str = "mentors";

    // Owners keep sight of their own row while unavailable so they can turn
    // availability back on.
    fn select(actor: Uuid) -> Predicate {
        Predicate::Any(vec![
            Predicate::IsTrue("available"),
            Predicate::Equals("id", actor),
        ])
    }

    fn insert_check(actor: Uuid) -> Predicate {
        Predicate::Equals("id", actor)
    }

    fn update_using(actor: Uuid) -> Predicate {
        Predicate::Equals("id", actor)
    }

    fn update_check(actor: Uuid) -> Predicate {
        Predicate::Equals("id", actor)
    }
}

pub struct BookingPolicy;

impl BookingPolicy {
    fn participant(actor: Uuid) -> Predicate {
        Predicate::Any(vec![
            Predicate::Equals("user_id", actor),
            Predicate::Equals("mentor_id", actor),
        ])
    }
}

impl RowPolicy for BookingPolicy {
    const TABLE: &'static str = "bookings";

    fn select(actor: Uuid) -> Predicate {
        Self::participant(actor)
    }

    fn insert_check(actor: Uuid) -> Predicate {
        Predicate::Equals("user_id", actor)
    }

    fn update_using(actor: Uuid) -> Predicate {
        Self::participant(actor)
    }

    fn update_check(actor: Uuid) -> Predicate {
        Self::participant(actor)
    }
}
