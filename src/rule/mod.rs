//! # Rules
//!
//! The immutable rule graph an [`ActivityContext`](crate::activity::ActivityContext)
//! is built from: translets, their request/response/content declarations,
//! exception rules and aspects.
//!
//! Rules are assembled with builder-style methods and shared read-only across
//! all concurrent activities once the context is built.

mod action;
mod aspect;
mod choose;
mod exception;
mod item;
mod request;
mod response;
mod translet;

pub use action::{
    ActionKind, ActionList, ActionRule, BeanMethodActionRule, BeanRef, ContentList, EchoActionRule,
    HeaderActionRule, IncludeActionRule,
};
pub use aspect::{AdviceRule, AdviceType, AspectRule, AspectRuleBuilder, JoinpointScope, PointcutType};
pub use choose::{ChooseRule, ChooseRuleMap, WhenRule};
pub use exception::{ExceptionRule, ExceptionThrownRule};
pub use item::{ItemRule, ItemRuleList, ItemValue};
pub use request::RequestRule;
pub use response::{
    DispatchRule, ForwardRule, RedirectRule, Response, ResponseRule, TransformFormat, TransformRule,
};
pub use translet::TransletRule;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ActivityError;

/// Request method a translet or aspect can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MethodType {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
    Connect,
}

impl MethodType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MethodType {
    type Err = ActivityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "TRACE" => Ok(Self::Trace),
            "CONNECT" => Ok(Self::Connect),
            other => Err(ActivityError::IllegalRule(format!("unknown request method '{other}'"))),
        }
    }
}
