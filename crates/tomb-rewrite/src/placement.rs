//! Join-placement state machine.
//!
//! Decides where the soft-delete constraint of every table in a join chain
//! goes. A constraint on the row-preserving side of an outer join cannot live
//! in that join's `ON` (the outer join would keep the row anyway), so such a
//! table is *carried*: either into the `ON` of a later join that can filter
//! it, or, if none follows, into the statement's `WHERE`.
//!
//! [`transition`] is the pure state function; [`plan`] folds it over a chain.

use crate::matcher::{JoinChain, TableFactor, TableRef};
use crate::registry::SoftDeleteRegistry;

/// Join types as far as constraint placement is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinCategory {
    /// Comma, `JOIN`, `INNER`, `CROSS` and `STRAIGHT_JOIN`.
    CommaOrInner,
    Left,
    Right,
}

/// The category of the previous join, or `Start` before the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlacementState {
    #[default]
    Start,
    CommaOrInner,
    Left,
    Right,
}

impl From<JoinCategory> for PlacementState {
    fn from(category: JoinCategory) -> Self {
        match category {
            JoinCategory::CommaOrInner => PlacementState::CommaOrInner,
            JoinCategory::Left => PlacementState::Left,
            JoinCategory::Right => PlacementState::Right,
        }
    }
}

/// What happens to the carried table at one join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarryUpdate {
    Keep,
    /// The left-most table becomes the carry.
    LeftTable,
    /// This join's right table becomes the carry.
    RightTable,
}

/// Placement decision for one join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Move the current carry into this join's `ON`.
    pub relocate_carry: bool,
    pub carry: CarryUpdate,
}

impl Transition {
    const KEEP: Transition = Transition {
        relocate_carry: false,
        carry: CarryUpdate::Keep,
    };
}

/// Advance the state machine by one join.
pub fn transition(state: PlacementState, join: JoinCategory) -> (PlacementState, Transition) {
    use JoinCategory as J;
    use PlacementState as S;

    let decision = match (state, join) {
        (S::Start, J::CommaOrInner) => Transition::KEEP,
        (S::Start, J::Left) => Transition {
            relocate_carry: false,
            carry: CarryUpdate::LeftTable,
        },
        (S::Start, J::Right) | (S::CommaOrInner, J::Right) => Transition {
            relocate_carry: false,
            carry: CarryUpdate::RightTable,
        },
        (S::CommaOrInner, J::CommaOrInner) | (S::CommaOrInner, J::Left) => Transition::KEEP,
        (S::Left, J::Left) | (S::Right, J::Left) => Transition::KEEP,
        (S::Left, J::Right) | (S::Right, J::Right) => Transition {
            relocate_carry: true,
            carry: CarryUpdate::RightTable,
        },
        // Relocating empties the carry; nothing replaces it.
        (S::Left, J::CommaOrInner) | (S::Right, J::CommaOrInner) => Transition {
            relocate_carry: true,
            carry: CarryUpdate::Keep,
        },
    };

    (join.into(), decision)
}

/// Constraints for one join's `ON`, in conjunction order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepPlan {
    /// Effective names of the tables to constrain.
    pub constraints: Vec<String>,
}

/// Placement of every constraint in a join chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinPlan {
    /// One entry per join step.
    pub steps: Vec<StepPlan>,
    /// The table whose constraint must go into `WHERE`.
    pub where_carry: Option<String>,
}

impl JoinPlan {
    /// Every constrained table, `ON` placements first.
    pub fn constrained_tables(&self) -> impl Iterator<Item = &str> {
        self.steps
            .iter()
            .flat_map(|step| step.constraints.iter())
            .chain(self.where_carry.iter())
            .map(String::as_str)
    }
}

/// Effective name of `table` if it is a soft-delete table.
fn soft_delete_target(table: &TableRef, registry: &SoftDeleteRegistry) -> Option<String> {
    match &table.factor {
        TableFactor::Named(name) if registry.is_soft_delete_table(name) => {
            table.effective_name().map(str::to_string)
        }
        _ => None,
    }
}

/// Compute where each soft-delete constraint of `chain` is placed.
pub fn plan(chain: &JoinChain, registry: &SoftDeleteRegistry) -> JoinPlan {
    let left_target = soft_delete_target(&chain.left, registry);
    if chain.steps.is_empty() {
        return JoinPlan {
            steps: Vec::new(),
            where_carry: left_target,
        };
    }

    let mut state = PlacementState::Start;
    let mut carry: Option<String> = None;
    let mut steps = Vec::with_capacity(chain.steps.len());

    for (index, step) in chain.steps.iter().enumerate() {
        let right_target = soft_delete_target(&step.table, registry);
        let (next, decision) = transition(state, step.kind.category());

        let relocated = if decision.relocate_carry {
            carry.take()
        } else {
            None
        };

        let mut constraints = Vec::new();
        match decision.carry {
            CarryUpdate::Keep => {}
            CarryUpdate::LeftTable => carry = left_target.clone(),
            CarryUpdate::RightTable => carry = right_target.clone(),
        }

        if index == 0 && decision.carry != CarryUpdate::LeftTable {
            constraints.extend(left_target.clone());
        }
        if decision.carry != CarryUpdate::RightTable {
            constraints.extend(right_target);
        }
        constraints.extend(relocated);

        tracing::debug!(
            join = %step.kind,
            ?state,
            ?decision,
            on = ?constraints,
            carry = ?carry,
            "placed join constraints"
        );

        steps.push(StepPlan { constraints });
        state = next;
    }

    JoinPlan {
        steps,
        where_carry: carry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, Item};
    use crate::lexer::tokenize;
    use crate::matcher::parse_table_refs;

    fn plan_for(table_refs: &str) -> JoinPlan {
        let registry = SoftDeleteRegistry::new(["hist_a", "hist_b", "hist_c", "hist_d"]);
        let items = tokenize(table_refs)
            .unwrap()
            .into_iter()
            .map(Item::Token)
            .collect();
        let frame = Frame::new(table_refs, items);
        let chain = parse_table_refs(&frame, 0..frame.len(), 64).unwrap();
        plan(&chain, &registry)
    }

    fn ons(plan: &JoinPlan) -> Vec<Vec<&str>> {
        plan.steps
            .iter()
            .map(|s| s.constraints.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_transition_table() {
        use CarryUpdate::*;
        use JoinCategory as J;
        use PlacementState as S;

        let cases = [
            (S::Start, J::CommaOrInner, false, Keep),
            (S::Start, J::Left, false, LeftTable),
            (S::Start, J::Right, false, RightTable),
            (S::CommaOrInner, J::CommaOrInner, false, Keep),
            (S::CommaOrInner, J::Right, false, RightTable),
            (S::CommaOrInner, J::Left, false, Keep),
            (S::Left, J::Left, false, Keep),
            (S::Left, J::Right, true, RightTable),
            (S::Left, J::CommaOrInner, true, Keep),
            (S::Right, J::Left, false, Keep),
            (S::Right, J::Right, true, RightTable),
            (S::Right, J::CommaOrInner, true, Keep),
        ];

        for (state, join, relocate_carry, carry) in cases {
            let (next, decision) = transition(state, join);
            assert_eq!(next, PlacementState::from(join));
            assert_eq!(
                decision,
                Transition {
                    relocate_carry,
                    carry
                },
                "{state:?} -> {join:?}"
            );
        }
    }

    #[test]
    fn test_single_table_is_carried_to_where() {
        let plan = plan_for("hist_a");
        assert!(plan.steps.is_empty());
        assert_eq!(plan.where_carry.as_deref(), Some("hist_a"));

        let plan = plan_for("plain");
        assert_eq!(plan.where_carry, None);
    }

    #[test]
    fn test_inner_join_constrains_both_sides_in_on() {
        let plan = plan_for("hist_a a, hist_b b");
        assert_eq!(ons(&plan), vec![vec!["a", "b"]]);
        assert_eq!(plan.where_carry, None);
    }

    #[test]
    fn test_left_join_carries_left_table() {
        let plan = plan_for("hist_a LEFT JOIN plain_b ON hist_a.id = plain_b.a_id");
        assert_eq!(ons(&plan), vec![Vec::<&str>::new()]);
        assert_eq!(plan.where_carry.as_deref(), Some("hist_a"));

        let plan = plan_for("hist_a a LEFT JOIN hist_b b ON a.id = b.a_id");
        assert_eq!(ons(&plan), vec![vec!["b"]]);
        assert_eq!(plan.where_carry.as_deref(), Some("a"));
    }

    #[test]
    fn test_right_join_carries_right_table() {
        let plan = plan_for("hist_a RIGHT JOIN hist_b ON hist_a.id = hist_b.a_id");
        assert_eq!(ons(&plan), vec![vec!["hist_a"]]);
        assert_eq!(plan.where_carry.as_deref(), Some("hist_b"));
    }

    #[test]
    fn test_left_then_inner_relocates_carry() {
        let plan = plan_for(
            "hist_a LEFT JOIN hist_b ON hist_a.id = hist_b.a_id \
             INNER JOIN hist_c ON hist_c.b_id = hist_b.id",
        );
        assert_eq!(ons(&plan), vec![vec!["hist_b"], vec!["hist_c", "hist_a"]]);
        assert_eq!(plan.where_carry, None);
    }

    #[test]
    fn test_left_then_right_hands_carry_over() {
        let plan = plan_for("hist_a LEFT JOIN hist_b ON x = y RIGHT JOIN hist_c ON y = z");
        assert_eq!(ons(&plan), vec![vec!["hist_b"], vec!["hist_a"]]);
        assert_eq!(plan.where_carry.as_deref(), Some("hist_c"));
    }

    #[test]
    fn test_right_then_left_keeps_carry() {
        let plan = plan_for("hist_a RIGHT JOIN hist_b ON x = y LEFT JOIN hist_c ON y = z");
        assert_eq!(ons(&plan), vec![vec!["hist_a"], vec!["hist_c"]]);
        assert_eq!(plan.where_carry.as_deref(), Some("hist_b"));
    }

    #[test]
    fn test_inner_then_right_then_inner() {
        let plan = plan_for("hist_a JOIN hist_b ON x = y RIGHT JOIN hist_c ON y = z JOIN hist_d ON z = w");
        assert_eq!(
            ons(&plan),
            vec![vec!["hist_a", "hist_b"], vec![], vec!["hist_d", "hist_c"]]
        );
        assert_eq!(plan.where_carry, None);
    }

    #[test]
    fn test_non_registry_tables_are_never_constrained() {
        let plan = plan_for("plain_a LEFT JOIN plain_b ON x = y JOIN plain_c ON y = z");
        assert!(plan.steps.iter().all(|s| s.constraints.is_empty()));
        assert_eq!(plan.where_carry, None);
        assert_eq!(plan.constrained_tables().count(), 0);
    }
}
