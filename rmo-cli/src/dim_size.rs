use std::cmp::Ordering;

/// Size to use for a symbolic dimension of a graph input.
#[derive(Clone, Debug, PartialEq)]
pub struct DimSize {
    /// Name of the graph input. If `None`, this applies to every input.
    pub input_name: Option<String>,

    /// Name of the symbolic dimension.
    pub dim_name: String,

    pub size: usize,
}

impl DimSize {
    /// Return true if `self` gives the size for dimension `dim_name` of
    /// input `input_name`.
    pub fn matches(&self, input_name: &str, dim_name: &str) -> bool {
        self.dim_name == dim_name
            && self
                .input_name
                .as_deref()
                .is_none_or(|name| name == input_name)
    }

    /// Parse a size in the form `dim_name=size` or
    /// `input_name.dim_name=size`.
    ///
    /// Names containing `.` or `=` can be quoted, eg. `"input.0".height=5`.
    pub fn parse(spec: &str) -> Result<DimSize, ParseError> {
        let tokens = tokenize(spec);
        let Some(eq_pos) = tokens.iter().position(|tok| *tok == Token::Equals) else {
            return Err(ParseError::new(spec, ParseErrorKind::MissingEquals));
        };
        let (names, size) = tokens.split_at(eq_pos);

        let [Token::Equals, Token::Text(size)] = size else {
            return Err(ParseError::new(spec, ParseErrorKind::InvalidSize));
        };
        let size: usize = size
            .parse()
            .map_err(|_| ParseError::new(spec, ParseErrorKind::InvalidSize))?;

        let (input_name, dim_name) = match names {
            [Token::Text(dim)] => (None, dim.clone()),
            [Token::Text(input), Token::Dot, Token::Text(dim)] => {
                (Some(input.clone()), dim.clone())
            }
            _ => return Err(ParseError::new(spec, ParseErrorKind::InvalidName)),
        };

        Ok(DimSize {
            input_name,
            dim_name,
            size,
        })
    }

    /// Sort sizes so that the most specific comes first and remove
    /// duplicates.
    ///
    /// Sizes which name an input are ordered before those which apply to all
    /// inputs. When the same dimension is given more than once, the last
    /// entry wins.
    pub fn sort_dedup(sizes: &mut Vec<DimSize>) {
        sizes.sort_by(|a, b| {
            let specificity = match (&a.input_name, &b.input_name) {
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (a_name, b_name) => a_name.cmp(b_name),
            };
            specificity.then_with(|| a.dim_name.cmp(&b.dim_name))
        });

        // `dedup_by` keeps the first of each run. Reverse so that is the
        // entry given last. The sort is stable, so runs keep argument order.
        sizes.reverse();
        sizes.dedup_by(|a, b| a.input_name == b.input_name && a.dim_name == b.dim_name);
        sizes.reverse();
    }

    /// Return the size of dimension `dim_name` of input `input_name`, using
    /// the first matching entry in `sizes`.
    pub fn resolve(sizes: &[DimSize], input_name: &str, dim_name: &str) -> Option<usize> {
        sizes
            .iter()
            .find(|ds| ds.matches(input_name, dim_name))
            .map(|ds| ds.size)
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Equals,
    Dot,
    Text(String),
}

fn tokenize(spec: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut quoted = false;

    for ch in spec.chars() {
        match (ch, quoted) {
            ('"', _) => quoted = !quoted,
            ('=', false) => tokens.push(Token::Equals),
            ('.', false) => tokens.push(Token::Dot),
            (ch, _) => match tokens.last_mut() {
                Some(Token::Text(text)) => text.push(ch),
                _ => tokens.push(Token::Text(ch.into())),
            },
        }
    }

    tokens
}

#[derive(Clone, Debug, PartialEq)]
enum ParseErrorKind {
    /// No `=` separating the name and size.
    MissingEquals,
    /// The input or dimension name is empty or malformed.
    InvalidName,
    /// The size is missing or not a non-negative integer.
    InvalidSize,
}

/// Error parsing a `--size` argument.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    spec: String,
    kind: ParseErrorKind,
}

impl ParseError {
    fn new(spec: &str, kind: ParseErrorKind) -> ParseError {
        ParseError {
            spec: spec.to_string(),
            kind,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ParseErrorKind::MissingEquals => write!(
                f,
                "invalid dimension size \"{}\": expected <name>=<size>",
                self.spec
            ),
            ParseErrorKind::InvalidName => {
                write!(f, "invalid name in dimension size \"{}\"", self.spec)
            }
            ParseErrorKind::InvalidSize => write!(
                f,
                "invalid size in \"{}\": must be a non-negative integer",
                self.spec
            ),
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use rmo_testing::TestCases;

    use super::{DimSize, ParseError, ParseErrorKind};

    fn dim_size(input_name: Option<&str>, dim_name: &str, size: usize) -> DimSize {
        DimSize {
            input_name: input_name.map(|s| s.to_string()),
            dim_name: dim_name.to_string(),
            size,
        }
    }

    #[test]
    fn test_parse() {
        #[derive(Debug)]
        struct Case {
            spec: &'static str,
            expected: Result<DimSize, ParseErrorKind>,
        }

        let cases = [
            Case {
                spec: "height=5",
                expected: Ok(dim_size(None, "height", 5)),
            },
            Case {
                spec: "feature_map.width=7",
                expected: Ok(dim_size(Some("feature_map"), "width", 7)),
            },
            Case {
                spec: "\"fpn.p2\".height=50",
                expected: Ok(dim_size(Some("fpn.p2"), "height", 50)),
            },
            Case {
                spec: "x.\"h=w\"=1",
                expected: Ok(dim_size(Some("x"), "h=w", 1)),
            },
            Case {
                spec: "height",
                expected: Err(ParseErrorKind::MissingEquals),
            },
            Case {
                spec: "height=",
                expected: Err(ParseErrorKind::InvalidSize),
            },
            Case {
                spec: "height=-1",
                expected: Err(ParseErrorKind::InvalidSize),
            },
            Case {
                spec: "=5",
                expected: Err(ParseErrorKind::InvalidName),
            },
            Case {
                spec: "a.b.c=5",
                expected: Err(ParseErrorKind::InvalidName),
            },
        ];

        cases.test_each(|case| {
            let expected = case
                .expected
                .clone()
                .map_err(|kind| ParseError::new(case.spec, kind));
            assert_eq!(DimSize::parse(case.spec), expected);
        })
    }

    #[test]
    fn test_matches() {
        let any_input = dim_size(None, "height", 5);
        assert!(any_input.matches("feature_map", "height"));
        assert!(!any_input.matches("feature_map", "width"));

        let one_input = dim_size(Some("feature_map"), "height", 5);
        assert!(one_input.matches("feature_map", "height"));
        assert!(!one_input.matches("image", "height"));
    }

    #[test]
    fn test_sort_dedup_and_resolve() {
        let mut sizes = vec![
            dim_size(None, "height", 1),
            dim_size(None, "height", 2),
            dim_size(Some("image"), "height", 800),
        ];
        DimSize::sort_dedup(&mut sizes);

        assert_eq!(
            sizes,
            [dim_size(Some("image"), "height", 800), dim_size(None, "height", 2)]
        );
        assert_eq!(DimSize::resolve(&sizes, "image", "height"), Some(800));
        assert_eq!(DimSize::resolve(&sizes, "feature_map", "height"), Some(2));
        assert_eq!(DimSize::resolve(&sizes, "feature_map", "width"), None);
    }

    #[test]
    fn test_display() {
        let err = DimSize::parse("height=x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid size in \"height=x\": must be a non-negative integer"
        );
    }
}
