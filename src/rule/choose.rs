use std::collections::BTreeMap;

use super::action::ActionRule;
use super::response::Response;
use crate::error::{ActivityError, ActivityResult};
use crate::expression::{Condition, TokenEvaluator};

/// One branch of a choose action. A branch without a condition is the `otherwise` branch.
#[derive(Debug, Clone, PartialEq)]
pub struct WhenRule {
    case_no: u32,
    condition: Option<Condition>,
    actions: Vec<ActionRule>,
    response: Option<Response>,
}

impl WhenRule {
    pub fn when(condition: &str) -> ActivityResult<Self> {
        Ok(Self {
            case_no: 0,
            condition: Some(Condition::parse(condition)?),
            actions: Vec::new(),
            response: None,
        })
    }

    pub fn otherwise() -> Self {
        Self {
            case_no: 0,
            condition: None,
            actions: Vec::new(),
            response: None,
        }
    }

    pub fn action(mut self, action: impl Into<ActionRule>) -> Self {
        self.actions.push(action.into());
        self
    }

    pub fn response(mut self, response: impl Into<Response>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn case_no(&self) -> u32 {
        self.case_no
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn actions(&self) -> &[ActionRule] {
        &self.actions
    }

    pub fn reserved_response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn is_otherwise(&self) -> bool {
        self.condition.is_none()
    }
}

/// Conditional branching: the first branch whose condition holds is selected,
/// falling back to the `otherwise` branch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChooseRule {
    choose_no: u32,
    whens: Vec<WhenRule>,
}

impl ChooseRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when(mut self, mut rule: WhenRule) -> Self {
        rule.case_no = case_no(self.choose_no, self.whens.len());
        self.whens.push(rule);
        self
    }

    pub fn choose_no(&self) -> u32 {
        self.choose_no
    }

    pub fn whens(&self) -> &[WhenRule] {
        &self.whens
    }

    pub fn select(&self, evaluator: &TokenEvaluator<'_>) -> Option<&WhenRule> {
        self.whens
            .iter()
            .filter_map(|when| when.condition.as_ref().map(|condition| (when, condition)))
            .find(|(_, condition)| condition.evaluate(evaluator))
            .map(|(when, _)| when)
            .or_else(|| self.whens.iter().find(|when| when.is_otherwise()))
    }
}

fn case_no(choose_no: u32, index: usize) -> u32 {
    choose_no * 1000 + index as u32 + 1
}

/// Assembles choose rules for one action list from separately declared parts.
///
/// Branch actions and responses are joined by case number; a case number that
/// no declared branch owns is a rule error.
#[derive(Debug, Default)]
pub struct ChooseRuleMap {
    chooses: BTreeMap<u32, ChooseRule>,
}

impl ChooseRuleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new choose group and returns its number.
    pub fn new_choose(&mut self) -> u32 {
        let choose_no = self.chooses.len() as u32 + 1;
        self.chooses.insert(
            choose_no,
            ChooseRule {
                choose_no,
                whens: Vec::new(),
            },
        );
        choose_no
    }

    /// Adds a branch to a group and returns the branch's case number.
    pub fn add_when(&mut self, choose_no: u32, when: WhenRule) -> ActivityResult<u32> {
        let choose = self.chooses.get_mut(&choose_no).ok_or_else(|| {
            ActivityError::IllegalRule(format!("no choose group numbered {choose_no}"))
        })?;
        let taken = std::mem::take(choose);
        *choose = taken.when(when);
        Ok(case_no(choose_no, choose.whens.len() - 1))
    }

    pub fn join_action(&mut self, case_no: u32, action: impl Into<ActionRule>) -> ActivityResult<()> {
        self.when_mut(case_no)?.actions.push(action.into());
        Ok(())
    }

    pub fn join_response(&mut self, case_no: u32, response: impl Into<Response>) -> ActivityResult<()> {
        self.when_mut(case_no)?.response = Some(response.into());
        Ok(())
    }

    pub fn into_actions(self) -> Vec<ActionRule> {
        self.chooses.into_values().map(ActionRule::Choose).collect()
    }

    fn when_mut(&mut self, case_no: u32) -> ActivityResult<&mut WhenRule> {
        self.chooses
            .values_mut()
            .flat_map(|choose| choose.whens.iter_mut())
            .find(|when| when.case_no == case_no)
            .ok_or_else(|| {
                ActivityError::IllegalRule(format!(
                    "no choose branch declared for case number {case_no}"
                ))
            })
    }
}
