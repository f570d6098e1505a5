//! Syntactic purity rules over top-level statements
//!
//! The check is a heuristic: it only looks at the statements at the top of
//! the program. Effects nested inside helpers, aliased primitives and the
//! like pass unnoticed.

use fnforge_core::ast::{Expr, Item, Program, Stmt};
use tracing::debug;

use crate::verdict::{ImpurityReason, Verdict};

/// Callees that reach the network
pub const NETWORK_PRIMITIVES: &[&str] = &["fetch", "XMLHttpRequest", "WebSocket"];

/// Callees that reach the host operating system
pub const OS_PRIMITIVES: &[&str] = &["require", "process", "fs", "child_process"];

/// Identifier whose methods write to the console
pub const CONSOLE_OBJECT: &str = "console";

/// Bare identifiers that read no variable
const HARMLESS_IDENTIFIERS: &[&str] = &["undefined", "null"];

#[derive(Debug, Clone)]
pub struct PurityChecker {
    network_primitives: Vec<String>,
    os_primitives: Vec<String>,
}

impl Default for PurityChecker {
    fn default() -> Self {
        Self {
            network_primitives: NETWORK_PRIMITIVES.iter().map(|s| s.to_string()).collect(),
            os_primitives: OS_PRIMITIVES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PurityChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn network_primitives(&self) -> &[String] {
        &self.network_primitives
    }

    pub fn os_primitives(&self) -> &[String] {
        &self.os_primitives
    }

    /// Check a parsed program. `source` is the text it was parsed from and
    /// is only used to render the offending statement.
    pub fn check(&self, program: &Program, source: &str) -> Verdict {
        let params = program.entry().param_names();

        for item in &program.items {
            if let Some(reason) = self.check_statement(item, source, &params) {
                debug!(rule = reason.rule(), statement = reason.statement(), "impure statement");
                return Verdict::Impure(reason);
            }
        }

        Verdict::Pure
    }

    /// Apply every rule to a single top-level statement
    pub fn check_statement(
        &self,
        item: &Item,
        source: &str,
        params: &[String],
    ) -> Option<ImpurityReason> {
        let Stmt::Expr(expr) = &item.stmt else {
            return None;
        };
        let statement = || statement_text(item, source);

        match expr {
            Expr::Call { callee, .. } => {
                if let Expr::Ident(name) = callee.as_ref() {
                    if self.network_primitives.iter().any(|p| p == name) {
                        return Some(ImpurityReason::NetworkAccess {
                            callee: name.clone(),
                            statement: statement(),
                        });
                    }
                    if self.os_primitives.iter().any(|p| p == name) {
                        return Some(ImpurityReason::OsAccess {
                            callee: name.clone(),
                            statement: statement(),
                        });
                    }
                }
                if is_console_method(callee) {
                    return Some(ImpurityReason::ConsoleAccess {
                        statement: statement(),
                    });
                }
                None
            }
            Expr::Ident(name) => {
                if HARMLESS_IDENTIFIERS.contains(&name.as_str()) {
                    None
                } else {
                    Some(ImpurityReason::VariableAccess {
                        name: name.clone(),
                        statement: statement(),
                    })
                }
            }
            Expr::Literal(_) => None,
            Expr::Assign { target, .. } => {
                if let Expr::Ident(name) = target.as_ref() {
                    if params.contains(name) {
                        return Some(ImpurityReason::InputModification {
                            name: name.clone(),
                            statement: statement(),
                        });
                    }
                }
                Some(ImpurityReason::SideEffect {
                    expression: expr.kind_name(),
                    statement: statement(),
                })
            }
            other => Some(ImpurityReason::SideEffect {
                expression: other.kind_name(),
                statement: statement(),
            }),
        }
    }
}

fn is_console_method(callee: &Expr) -> bool {
    match callee {
        Expr::Member { object, .. } => {
            matches!(object.as_ref(), Expr::Ident(name) if name == CONSOLE_OBJECT)
        }
        _ => false,
    }
}

fn statement_text(item: &Item, source: &str) -> String {
    source
        .get(item.span.clone())
        .unwrap_or_default()
        .trim()
        .to_string()
}
