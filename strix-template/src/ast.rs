//! Input contract with the (external) template parser.
//!
//! Siblings arrive in stable source order; the compiler derives all
//! reconciliation keys from that order, so the parser never assigns keys.

/// Attribute or component-prop source: a literal string, or an expression
/// evaluated at render time.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrSource {
    Literal(String),
    Expr(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name: String,
    pub value: AttrSource,
}

impl Attr {
    pub fn lit(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttrSource::Literal(value.into()),
        }
    }

    pub fn expr(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttrSource::Expr(expr.into()),
        }
    }
}

/// One `elif` arm of a conditional chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Elif {
    pub condition: String,
    pub body: Vec<Ast>,
}

/// A closed if / elif* / else? chain.
#[derive(Debug, Clone, PartialEq)]
pub struct IfChain {
    pub condition: String,
    pub body: Vec<Ast>,
    pub elifs: Vec<Elif>,
    pub else_body: Option<Vec<Ast>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    /// A concrete output element.
    Dom {
        tag: String,
        attrs: Vec<Attr>,
        children: Vec<Ast>,
    },
    /// Literal text.
    Text(String),
    /// Literal comment.
    Comment(String),
    /// Structural grouping (fragment bodies, loop bodies).
    Multi(Vec<Ast>),
    /// Escaped expression output, with an optional fallback body rendered
    /// when the expression is undefined.
    Esc { expr: String, body: Vec<Ast> },
    /// Template variable binding: a literal value expression, a rendered
    /// body, or both (body as fallback when the value is falsy).
    Set {
        name: String,
        value: Option<String>,
        body: Vec<Ast>,
    },
    If(IfChain),
    /// Reference to a sub-component, resolved at render time.
    Component { name: String, props: Vec<Attr> },
    /// Render `body` once per item of the `list` expression, with `var`
    /// (and `var_index` / `var_first` / `var_last`) bound per iteration.
    Repeat {
        list: String,
        var: String,
        body: Vec<Ast>,
    },
}

impl Ast {
    pub fn dom(tag: impl Into<String>, attrs: Vec<Attr>, children: Vec<Ast>) -> Self {
        Ast::Dom {
            tag: tag.into(),
            attrs,
            children,
        }
    }

    pub fn text(t: impl Into<String>) -> Self {
        Ast::Text(t.into())
    }

    pub fn esc(expr: impl Into<String>) -> Self {
        Ast::Esc {
            expr: expr.into(),
            body: Vec::new(),
        }
    }

    pub fn component(name: impl Into<String>) -> Self {
        Ast::Component {
            name: name.into(),
            props: Vec::new(),
        }
    }

    pub fn if_else(condition: impl Into<String>, body: Vec<Ast>, else_body: Vec<Ast>) -> Self {
        Ast::If(IfChain {
            condition: condition.into(),
            body,
            elifs: Vec::new(),
            else_body: Some(else_body),
        })
    }
}
