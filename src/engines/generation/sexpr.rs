use crate::engines::generation::node::Node;
use crate::error::{GpError, Result};
use crate::functions::registry::Palette;
use std::iter::Peekable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Open,
    Close,
    Name(&'a str),
}

/// Splits on whitespace and parentheses, so `(+ x y)` and `( + x y )`
/// produce the same tokens.
fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in source.char_indices() {
        if c.is_whitespace() || c == '(' || c == ')' {
            if let Some(s) = start.take() {
                tokens.push(Token::Name(&source[s..i]));
            }
            match c {
                '(' => tokens.push(Token::Open),
                ')' => tokens.push(Token::Close),
                _ => {}
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(Token::Name(&source[s..]));
    }
    tokens
}

/// Rebuilds a tree from its prefix text form, cloning each named prototype
/// out of `palette`.
pub fn parse<I: 'static>(source: &str, palette: &Palette<I>) -> Result<Node<I>> {
    let mut tokens = tokenize(source).into_iter().peekable();
    let node = parse_expression(&mut tokens, palette)?;
    match tokens.next() {
        None => Ok(node),
        Some(token) => Err(GpError::Parse(format!(
            "Unexpected trailing token {:?} in {:?}",
            token, source
        ))),
    }
}

fn parse_expression<'a, I, T>(tokens: &mut Peekable<T>, palette: &Palette<I>) -> Result<Node<I>>
where
    I: 'static,
    T: Iterator<Item = Token<'a>>,
{
    match tokens.next() {
        Some(Token::Name(name)) => {
            let node = lookup(name, palette)?;
            if !node.is_terminal() {
                return Err(GpError::Parse(format!(
                    "Functional node {} must be written as ( {} … )",
                    name, name
                )));
            }
            Ok(node)
        }
        Some(Token::Open) => {
            let name = match tokens.next() {
                Some(Token::Name(name)) => name,
                other => {
                    return Err(GpError::Parse(format!(
                        "Expected a node name after '(', found {:?}",
                        other
                    )))
                }
            };
            let mut node = lookup(name, palette)?;
            let arity = node.arity().ok_or_else(|| {
                GpError::Parse(format!("Terminal {} cannot take children", name))
            })?;

            loop {
                match tokens.peek() {
                    Some(Token::Close) => {
                        tokens.next();
                        break;
                    }
                    None => {
                        return Err(GpError::Parse(format!("Unclosed '(' after {}", name)));
                    }
                    Some(_) => {
                        let child = parse_expression(tokens, palette)?;
                        if !node.push_child(child) {
                            return Err(GpError::Parse(format!(
                                "{} takes at most {:?} children",
                                name, arity.max
                            )));
                        }
                    }
                }
            }

            let count = node.children().len();
            if !arity.allows(count) {
                return Err(GpError::Parse(format!(
                    "{} needs at least {} children, got {}",
                    name, arity.min, count
                )));
            }
            Ok(node)
        }
        Some(Token::Close) => Err(GpError::Parse("Unexpected ')'".to_string())),
        None => Err(GpError::Parse("Unexpected end of input".to_string())),
    }
}

fn lookup<I: 'static>(name: &str, palette: &Palette<I>) -> Result<Node<I>> {
    palette
        .find(name)
        .cloned()
        .ok_or_else(|| GpError::UnknownPrimitive(name.to_string()))
}

impl<I: 'static> Node<I> {
    /// Inverse of the `Display` form.
    pub fn parse(source: &str, palette: &Palette<I>) -> Result<Self> {
        parse(source, palette)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point {
        x: f64,
        y: f64,
    }

    fn palette() -> Palette<Point> {
        let mut palette = Palette::new().with_arithmetic();
        palette
            .add_terminal("x", |p: &Point| Ok(p.x))
            .add_terminal("y", |p: &Point| Ok(p.y));
        palette
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("(+ x( - y x))"),
            vec![
                Token::Open,
                Token::Name("+"),
                Token::Name("x"),
                Token::Open,
                Token::Name("-"),
                Token::Name("y"),
                Token::Name("x"),
                Token::Close,
                Token::Close,
            ]
        );
    }

    #[test]
    fn test_round_trip() {
        let palette = palette();
        let text = "( + y ( * x ( - y x ) ) )";
        let tree = Node::parse(text, &palette).unwrap();
        assert_eq!(tree.to_string(), text);

        let again = Node::parse(&tree.to_string(), &palette).unwrap();
        assert!(again.structurally_eq(&tree));
        assert_eq!(tree.execute(&Point { x: 2.0, y: 3.0 }).unwrap(), 5.0);
    }

    #[test]
    fn test_bare_terminal() {
        let tree = Node::parse("x", &palette()).unwrap();
        assert!(tree.is_terminal());
        assert_eq!(tree.to_string(), "x");
    }

    #[test]
    fn test_unknown_name() {
        let result = Node::parse("( + x z )", &palette());
        assert!(matches!(result, Err(GpError::UnknownPrimitive(name)) if name == "z"));
    }

    #[test]
    fn test_malformed_input() {
        let palette = palette();
        assert!(Node::parse("( + x y", &palette).is_err());
        assert!(Node::parse("( + x y ) x", &palette).is_err());
        assert!(Node::parse(")", &palette).is_err());
        assert!(Node::parse("", &palette).is_err());
        assert!(Node::parse("+", &palette).is_err());
        assert!(Node::parse("( x y )", &palette).is_err());
    }

    #[test]
    fn test_arity_enforced() {
        let palette = palette();
        assert!(Node::parse("( + x )", &palette).is_err());
        assert!(Node::parse("( + x y x )", &palette).is_err());
    }
}
