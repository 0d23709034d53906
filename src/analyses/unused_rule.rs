//! Unused-rule warning (§4.1.2).
//!
//! Strictly advisory: this analysis only ever produces [`crate::diagnostics::Warning`]s,
//! never rejects a rule. The mode-incompatibility half of §4.1.2(b) (ground
//! position bound to a literal that can never match) is left conservative —
//! we only check the cheaper, unambiguous half: a head constraint that is
//! never called from any rule body anywhere in the program.

use crate::diagnostics::Warning;
use crate::program::Program;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct UnusedRuleWarning {
    pub rule_name: Option<String>,
    pub warning: Warning,
}

/// Returns one warning per rule with at least one head constraint that is
/// never invoked anywhere in any rule body in the program.
pub fn run(program: &Program) -> Vec<UnusedRuleWarning> {
    let mut called_anywhere = HashSet::new();
    for rule in &program.rules {
        crate::visitor::walk_body(
            &rule.body,
            &mut |b| {
                if let crate::ast::Body::ChrCall(call) = b {
                    called_anywhere.insert(call.constraint.clone());
                }
            },
            &mut |_| {},
        );
    }

    let mut warnings = Vec::new();
    for rule in &program.rules {
        let unreachable_head = rule.head().iter().find(|c| !called_anywhere.contains(&c.constraint));
        if let Some(head) = unreachable_head {
            let label = rule.name.clone().unwrap_or_else(|| format!("#{}", rule.id.0));
            warnings.push(UnusedRuleWarning {
                rule_name: rule.name.clone(),
                warning: Warning {
                    position: rule.position.clone(),
                    message: format!(
                        "rule `{label}` is potentially unused: head constraint `{}` is never called from any rule body",
                        head.constraint
                    ),
                },
            });
        }
    }
    warnings
}
