use crate::ast::{
    BlockStatement, ClassStatement, Expression, FStringPart, FunctionLiteral, Program, Statement,
};

/// Renders AST nodes in a parenthesised prefix form, e.g. `1 + 2 * 3`
/// becomes `(+ 1 (* 2 3))`.  Used by the CLI `parse` command and by parser
/// tests to check grouping without comparing whole trees.
pub struct AstPrinter;

impl AstPrinter {
    pub fn program(program: &Program) -> String {
        program
            .statements
            .iter()
            .map(Self::statement)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn statement(statement: &Statement) -> String {
        match statement {
            Statement::Let(decl) => {
                format!("(let {} {})", decl.name.name, Self::print(&decl.value))
            }

            Statement::Const(decl) => {
                format!("(const {} {})", decl.name.name, Self::print(&decl.value))
            }

            Statement::Return(ret) => match &ret.value {
                Some(value) => format!("(return {})", Self::print(value)),
                None => "(return)".into(),
            },

            Statement::Expression(stmt) => Self::print(&stmt.expression),

            Statement::Block(block) => Self::block(block),

            Statement::While(stmt) => format!(
                "(while {} {})",
                Self::print(&stmt.condition),
                Self::block(&stmt.body)
            ),

            Statement::For(stmt) => {
                let init = stmt
                    .initializer
                    .as_deref()
                    .map_or_else(|| "_".to_string(), Self::statement);
                let cond = stmt
                    .condition
                    .as_ref()
                    .map_or_else(|| "_".to_string(), Self::print);
                let incr = stmt
                    .increment
                    .as_ref()
                    .map_or_else(|| "_".to_string(), Self::print);

                format!("(for {} {} {} {})", init, cond, incr, Self::block(&stmt.body))
            }

            Statement::Break(_) => "break".into(),

            Statement::Continue(_) => "continue".into(),

            Statement::Class(class) => Self::class(class),
        }
    }

    pub fn print(expr: &Expression) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expression::Identifier(ident) => ident.name.clone(),

            Expression::Integer(lit) => lit.value.to_string(),

            Expression::Float(lit) => format!("{:?}", lit.value),

            Expression::String(lit) => format!("{:?}", lit.value),

            Expression::Boolean(lit) => lit.value.to_string(),

            Expression::Null(_) => "null".into(),

            Expression::This(_) => "this".into(),

            Expression::FString(lit) => {
                let mut s = String::from("(fstring");
                for part in &lit.parts {
                    s.push(' ');
                    match part {
                        FStringPart::Text(text) => s.push_str(&format!("{:?}", text)),
                        FStringPart::Interpolation(inner) => s.push_str(&Self::print(inner)),
                    }
                }
                s.push(')');
                s
            }

            // ── collections ─────────────────────────────────────────────
            Expression::Array(lit) => Self::list("array", &lit.elements),

            Expression::Hash(lit) => {
                let mut s = String::from("(hash");
                for (key, value) in &lit.pairs {
                    s.push_str(&format!(" {:?} {}", key, Self::print(value)));
                }
                s.push(')');
                s
            }

            Expression::Function(func) => Self::function("fn", func),

            // ── operators ───────────────────────────────────────────────
            Expression::Prefix(e) => format!("({} {})", e.operator, Self::print(&e.right)),

            Expression::Infix(e) => format!(
                "({} {} {})",
                e.operator,
                Self::print(&e.left),
                Self::print(&e.right)
            ),

            Expression::Assignment(e) => {
                format!("(= {} {})", Self::print(&e.target), Self::print(&e.value))
            }

            // ── access & calls ──────────────────────────────────────────
            Expression::Call(e) => {
                let mut s = format!("(call {}", Self::print(&e.function));
                for arg in &e.arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            Expression::Index(e) => {
                format!("(index {} {})", Self::print(&e.left), Self::print(&e.index))
            }

            Expression::Property(e) => format!("(. {} {})", Self::print(&e.object), e.property.name),

            Expression::New(e) => {
                let mut s = format!("(new {}", Self::print(&e.class));
                for arg in &e.arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            Expression::Super(e) => {
                let head = match &e.method {
                    Some(method) => format!("super.{}", method.name),
                    None => "super".into(),
                };
                Self::list(&head, &e.arguments)
            }

            Expression::If(e) => {
                let mut s = String::from("(if");
                for (i, branch) in e.branches.iter().enumerate() {
                    if i == 0 {
                        s.push_str(&format!(
                            " {} {}",
                            Self::print(&branch.condition),
                            Self::block(&branch.consequence)
                        ));
                    } else {
                        s.push_str(&format!(
                            " (elif {} {})",
                            Self::print(&branch.condition),
                            Self::block(&branch.consequence)
                        ));
                    }
                }
                if let Some(alt) = &e.alternative {
                    s.push_str(&format!(" (else {})", Self::block(alt)));
                }
                s.push(')');
                s
            }
        }
    }

    fn block(block: &BlockStatement) -> String {
        if block.statements.is_empty() {
            return "{}".into();
        }

        let inner = block
            .statements
            .iter()
            .map(Self::statement)
            .collect::<Vec<_>>()
            .join(" ");

        format!("{{ {} }}", inner)
    }

    fn list(head: &str, items: &[Expression]) -> String {
        let mut s = format!("({}", head);
        for item in items {
            s.push(' ');
            s.push_str(&Self::print(item));
        }
        s.push(')');
        s
    }

    fn function(head: &str, func: &FunctionLiteral) -> String {
        let params = func
            .parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        format!("({} ({}) {})", head, params, Self::block(&func.body))
    }

    fn class(class: &ClassStatement) -> String {
        let mut s = format!("(class {}", class.name.name);

        if let Some(parent) = &class.parent {
            s.push_str(&format!(" extends {}", parent.name));
        }

        if let Some(ctor) = &class.constructor {
            s.push(' ');
            s.push_str(&Self::function("constructor", ctor));
        }

        for method in &class.methods {
            s.push(' ');
            s.push_str(&Self::function(&format!("method {}", method.name.name), &method.function));
        }

        s.push(')');
        s
    }
}
