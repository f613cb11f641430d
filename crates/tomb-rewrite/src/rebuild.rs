//! Clause rebuilder: turns a [`JoinPlan`] into edits of the table references.

use crate::error::RewriteError;
use crate::frame::{Frame, Splice};
use crate::matcher::{JoinChain, JoinCondition, JoinKind, JoinStep};
use crate::placement::JoinPlan;

/// Soft-delete filter for the table visible as `target`.
pub fn soft_delete_condition(target: &str, column: &str) -> String {
    format!("({target}.{column} = 0 OR {target}.{column} IS NULL)")
}

/// Edits for one `FROM` clause.
#[derive(Debug, Default)]
pub(crate) struct Rebuilt {
    /// One splice per join step that received constraints.
    pub splices: Vec<Splice>,
    /// Condition to add to the statement's `WHERE`.
    pub where_condition: Option<String>,
}

impl Rebuilt {
    pub fn is_unchanged(&self) -> bool {
        self.splices.is_empty() && self.where_condition.is_none()
    }
}

/// Re-emit every join step of `chain` that `plan` assigns constraints to.
///
/// Steps without constraints are left alone, so their text (spacing and
/// comments included) survives untouched.
pub(crate) fn rebuild(
    frame: &Frame<'_>,
    chain: &JoinChain,
    plan: &JoinPlan,
    column: &str,
) -> Result<Rebuilt, RewriteError> {
    let mut splices = Vec::new();

    for (step, step_plan) in chain.steps.iter().zip(&plan.steps) {
        if step_plan.constraints.is_empty() {
            continue;
        }

        let mut conditions: Vec<String> = step_plan
            .constraints
            .iter()
            .map(|target| soft_delete_condition(target, column))
            .collect();
        match &step.condition {
            Some(JoinCondition::On { items, .. }) => {
                conditions.push(format!("({})", frame.render_items(items)));
            }
            Some(JoinCondition::Using { .. }) => {
                return Err(RewriteError::UnsupportedJoinCondition {
                    join: format!("{} ... USING", step.kind),
                });
            }
            None if step.kind.is_natural() => {
                return Err(RewriteError::UnsupportedJoinCondition {
                    join: step.kind.to_string(),
                });
            }
            None => {}
        }

        splices.push(rebuild_step(frame, step, &conditions.join(" AND ")));
    }

    Ok(Rebuilt {
        splices,
        where_condition: plan
            .where_carry
            .as_deref()
            .map(|target| soft_delete_condition(target, column)),
    })
}

fn rebuild_step(frame: &Frame<'_>, step: &JoinStep, on: &str) -> Splice {
    let bytes = frame.byte_span(&step.items);
    let keyword = match step.kind {
        JoinKind::Comma => "INNER JOIN".to_string(),
        _ => frame.render_items(&step.keyword_items),
    };

    // A comma usually hugs the preceding table reference.
    let lead = if frame.src[..bytes.start]
        .chars()
        .next_back()
        .is_some_and(|c| !c.is_whitespace())
    {
        " "
    } else {
        ""
    };

    Splice {
        bytes,
        text: format!(
            "{lead}{keyword} {} ON {on}",
            frame.render_items(&step.table.items)
        ),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::frame::Item;
    use crate::lexer::tokenize;
    use crate::matcher::parse_table_refs;
    use crate::placement::plan;
    use crate::registry::SoftDeleteRegistry;

    fn rebuild_refs(table_refs: &str) -> Result<(String, Option<String>), RewriteError> {
        let registry = SoftDeleteRegistry::new(["hist_a", "hist_b", "hist_c"]);
        let items = tokenize(table_refs)?.into_iter().map(Item::Token).collect();
        let frame = Frame::new(table_refs, items);
        let chain = parse_table_refs(&frame, 0..frame.len(), 64)?;
        let plan = plan(&chain, &registry);
        let rebuilt = rebuild(&frame, &chain, &plan, "deleted")?;
        Ok((frame.render(rebuilt.splices), rebuilt.where_condition))
    }

    #[test]
    fn test_condition_text() {
        assert_eq!(
            soft_delete_condition("c", "is_gone"),
            "(c.is_gone = 0 OR c.is_gone IS NULL)"
        );
    }

    #[test]
    fn test_comma_join_becomes_inner_join() {
        let (refs, carry) = rebuild_refs("hist_a a, hist_b b").unwrap();
        assert_eq!(
            refs,
            "hist_a a INNER JOIN hist_b b ON (a.deleted = 0 OR a.deleted IS NULL) \
             AND (b.deleted = 0 OR b.deleted IS NULL)"
        );
        assert_eq!(carry, None);
    }

    #[test]
    fn test_user_condition_is_kept_last() {
        let (refs, carry) =
            rebuild_refs("hist_a LEFT JOIN hist_b ON hist_a.id = hist_b.a_id").unwrap();
        assert_eq!(
            refs,
            "hist_a LEFT JOIN hist_b ON (hist_b.deleted = 0 OR hist_b.deleted IS NULL) \
             AND (hist_a.id = hist_b.a_id)"
        );
        assert_eq!(
            carry.as_deref(),
            Some("(hist_a.deleted = 0 OR hist_a.deleted IS NULL)")
        );
    }

    #[test]
    fn test_unconstrained_steps_are_verbatim() {
        let src = "hist_a  left join /* keep */ plain_b ON x = y";
        let (refs, carry) = rebuild_refs(src).unwrap();
        assert_eq!(refs, src);
        assert!(carry.is_some());
    }

    #[test]
    fn test_keyword_spelling_is_preserved() {
        let (refs, _) = rebuild_refs("plain_a cross join hist_c").unwrap();
        assert_eq!(
            refs,
            "plain_a cross join hist_c ON (hist_c.deleted = 0 OR hist_c.deleted IS NULL)"
        );
    }

    #[test]
    fn test_using_join_cannot_take_constraints() {
        let err = rebuild_refs("hist_a JOIN hist_b USING (id)").unwrap_err();
        assert!(matches!(err, RewriteError::UnsupportedJoinCondition { .. }));

        // Nothing to attach: USING survives.
        let (refs, _) = rebuild_refs("plain_a JOIN plain_b USING (id)").unwrap();
        assert_eq!(refs, "plain_a JOIN plain_b USING (id)");
    }

    #[test]
    fn test_natural_join_cannot_take_constraints() {
        let err = rebuild_refs("plain_a NATURAL RIGHT JOIN hist_b NATURAL LEFT JOIN hist_c")
            .unwrap_err();
        assert_eq!(
            err,
            RewriteError::UnsupportedJoinCondition {
                join: "NATURAL LEFT JOIN".to_string()
            }
        );
    }
}
