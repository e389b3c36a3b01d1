use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};
use crate::token::TokenType;

/// Converts the AST to a parenthesised prefix form, e.g. `1 + 2 * 3`
/// becomes `(+ 1.0 (* 2.0 3.0))`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            // `&&` / `||` print under their keyword spelling.
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let op = if operator.token_type == TokenType::AND {
                    "and"
                } else {
                    "or"
                };
                format!("({} {} {})", op, Self::print(left), Self::print(right))
            }

            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => Self::list(&format!("call {}", Self::print(callee)), arguments),

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::Index { object, index, .. } => {
                format!("([] {} {})", Self::print(object), Self::print(index))
            }

            Expr::IndexSet {
                object,
                index,
                value,
                ..
            } => format!(
                "(= ([] {} {}) {})",
                Self::print(object),
                Self::print(index),
                Self::print(value)
            ),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            Expr::Function(decl) => Self::function("fun", decl),

            Expr::Array { elements, .. } => Self::list("array", elements),

            Expr::Object { entries, .. } => {
                let mut s = String::from("(object");
                for entry in entries {
                    s.push_str(&format!(
                        " ({} {})",
                        entry.key_name(),
                        Self::print(&entry.value)
                    ));
                }
                s.push(')');
                s
            }
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::Print(expr) => format!("(print {})", Self::print(expr)),

            Stmt::Var(declarations) => {
                let mut s = String::from("(var");
                for decl in declarations {
                    match &decl.initializer {
                        Some(init) => {
                            s.push_str(&format!(" (= {} {})", decl.name.lexeme, Self::print(init)))
                        }
                        None => s.push_str(&format!(" {}", decl.name.lexeme)),
                    }
                }
                s.push(')');
                s
            }

            Stmt::Block(statements) => Self::block("block", statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                Self::print(condition),
                Self::print_stmt(body)
            ),

            Stmt::Function(decl) => Self::function("fun", decl),

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", Self::print(value)),
                None => "(return)".into(),
            },

            Stmt::Class(class) => {
                let mut s = format!("(class {}", class.name.lexeme);
                if !class.superclasses.is_empty() {
                    let names: Vec<String> = class.superclasses.iter().map(Self::print).collect();
                    s.push_str(&format!(" (< {})", names.join(" ")));
                }
                for method in &class.methods {
                    s.push(' ');
                    s.push_str(&Self::function("method", method));
                }
                s.push(')');
                s
            }
        }
    }

    fn list(head: &str, items: &[Expr]) -> String {
        let mut s = format!("({}", head);
        for item in items {
            s.push(' ');
            s.push_str(&Self::print(item));
        }
        s.push(')');
        s
    }

    fn block(head: &str, statements: &[Stmt]) -> String {
        let mut s = format!("({}", head);
        for stmt in statements {
            s.push(' ');
            s.push_str(&Self::print_stmt(stmt));
        }
        s.push(')');
        s
    }

    fn function(head: &str, decl: &FunctionDecl) -> String {
        let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
        let head = format!("{} {} ({})", head, decl.display_name(), params.join(" "));
        Self::block(&head, &decl.body)
    }
}
