use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Input widgets a UI needs to collect values for an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    None,
    Input,
    TwoInputs,
    Select,
    SelectInput,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::None => "none",
            FieldType::Input => "input",
            FieldType::TwoInputs => "2inputs",
            FieldType::Select => "select",
            FieldType::SelectInput => "select+input",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Op {
    Eq,
    NotEq,
    Is,
    NotIs,
    Empty,
    NotEmpty,
    Contains,
    NotContains,
    LessThanEqual,
    GreaterThanEqual,
    Between,
    NotBetween,
    DaysAgo,
    LessThanDaysAgo,
    MoreThanDaysAgo,
    Today,
    ThisWeek,
    InLessThanDays,
    InMoreThanDays,
    InDays,
    ThisMonth,
    LastMonth,
    SelectMonth,
    ThisYear,
    All,
    Yes,
    No,
}

const ALL_OPS: [Op; 27] = [
    Op::Eq,
    Op::NotEq,
    Op::Is,
    Op::NotIs,
    Op::Empty,
    Op::NotEmpty,
    Op::Contains,
    Op::NotContains,
    Op::LessThanEqual,
    Op::GreaterThanEqual,
    Op::Between,
    Op::NotBetween,
    Op::DaysAgo,
    Op::LessThanDaysAgo,
    Op::MoreThanDaysAgo,
    Op::Today,
    Op::ThisWeek,
    Op::InLessThanDays,
    Op::InMoreThanDays,
    Op::InDays,
    Op::ThisMonth,
    Op::LastMonth,
    Op::SelectMonth,
    Op::ThisYear,
    Op::All,
    Op::Yes,
    Op::No,
];

impl Op {
    pub fn all() -> &'static [Op] {
        &ALL_OPS
    }

    pub fn from_key(key: &str) -> Option<Op> {
        ALL_OPS.iter().copied().find(|op| op.key() == key)
    }

    pub fn key(self) -> &'static str {
        match self {
            Op::Eq => "eq",
            Op::NotEq => "!eq",
            Op::Is => "is",
            Op::NotIs => "!is",
            Op::Empty => "empty",
            Op::NotEmpty => "!empty",
            Op::Contains => "contains",
            Op::NotContains => "!contains",
            Op::LessThanEqual => "lte",
            Op::GreaterThanEqual => "gte",
            Op::Between => "between",
            Op::NotBetween => "!between",
            Op::DaysAgo => "da",
            Op::LessThanDaysAgo => "ltda",
            Op::MoreThanDaysAgo => "mtda",
            Op::Today => "today",
            Op::ThisWeek => "thisweek",
            Op::InLessThanDays => "iltd",
            Op::InMoreThanDays => "imtd",
            Op::InDays => "ind",
            Op::ThisMonth => "thismonth",
            Op::LastMonth => "lastmonth",
            Op::SelectMonth => "selmonth",
            Op::ThisYear => "thisyear",
            Op::All => "a",
            Op::Yes => "y",
            Op::No => "n",
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            Op::Eq | Op::Is => "is",
            Op::NotEq | Op::NotIs => "is not",
            Op::Empty => "empty",
            Op::NotEmpty => "not empty",
            Op::Contains => "contains",
            Op::NotContains => "doesn't contain",
            Op::LessThanEqual => "less than or equal",
            Op::GreaterThanEqual => "greater than or equal",
            Op::Between => "between",
            Op::NotBetween => "not between",
            Op::DaysAgo => "days ago",
            Op::LessThanDaysAgo => "less than days ago",
            Op::MoreThanDaysAgo => "more than days ago",
            Op::Today => "today",
            Op::ThisWeek => "this week",
            Op::InLessThanDays => "in less than days",
            Op::InMoreThanDays => "in more than days",
            Op::InDays => "in days",
            Op::ThisMonth => "this month",
            Op::LastMonth => "last month",
            Op::SelectMonth => "select month",
            Op::ThisYear => "this year",
            Op::All => "all",
            Op::Yes => "yes",
            Op::No => "no",
        }
    }

    pub fn field_type(self) -> FieldType {
        match self {
            Op::Is | Op::NotIs => FieldType::Select,
            Op::Between | Op::NotBetween => FieldType::TwoInputs,
            Op::SelectMonth => FieldType::SelectInput,
            Op::Empty
            | Op::NotEmpty
            | Op::Today
            | Op::ThisWeek
            | Op::ThisMonth
            | Op::LastMonth
            | Op::ThisYear
            | Op::All
            | Op::Yes
            | Op::No => FieldType::None,
            _ => FieldType::Input,
        }
    }

    pub fn hint(self) -> Option<&'static str> {
        if self.is_day_count() {
            Some("days")
        } else {
            None
        }
    }

    /// Operators whose single value is a number of days.
    pub fn is_day_count(self) -> bool {
        matches!(
            self,
            Op::DaysAgo
                | Op::LessThanDaysAgo
                | Op::MoreThanDaysAgo
                | Op::InLessThanDays
                | Op::InMoreThanDays
                | Op::InDays
        )
    }

    pub fn takes_no_value(self) -> bool {
        self.field_type() == FieldType::None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized operator \"{0}\"")]
pub struct UnknownOperator(pub String);

impl FromStr for Op {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Op::from_key(s).ok_or_else(|| UnknownOperator(s.to_string()))
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl PartialEq<str> for Op {
    fn eq(&self, other: &str) -> bool {
        self.key() == other
    }
}

impl PartialEq<&str> for Op {
    fn eq(&self, other: &&str) -> bool {
        self.key() == *other
    }
}

impl PartialEq<Op> for str {
    fn eq(&self, other: &Op) -> bool {
        self == other.key()
    }
}

impl PartialEq<Op> for &str {
    fn eq(&self, other: &Op) -> bool {
        *self == other.key()
    }
}
