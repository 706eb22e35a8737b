//! Formula-based inversion functions loaded from configuration.
//!
//! A formula is an arithmetic expression over band names and coefficients,
//! e.g. `a * Red / (1 - Red / c)`. Identifiers declared in `coefficients`
//! are coefficients (their value is the default); every other identifier is a
//! band, in order of first appearance.
//!
//! Supports `+`, `-`, `*`, `/`, unary minus, parentheses and numeric constants.
use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::core::registry::{Descriptor, Inputs, InversionFunction, Signature};
use crate::error::{Error, Result};

/// Configuration entry describing one formula-based parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaSpec {
    /// Parameter name (registry key and output file stem)
    pub parameter: String,
    pub formula: String,
    #[serde(default)]
    pub coefficients: BTreeMap<String, f64>,
    #[serde(default)]
    pub units: Option<String>,
}

impl FormulaSpec {
    pub fn to_descriptor(&self) -> Result<Descriptor> {
        let function = FormulaFunction::parse(&self.parameter, &self.formula, &self.coefficients)?;
        let mut descriptor = Descriptor::new(self.parameter.clone(), Box::new(function));
        if let Some(units) = &self.units {
            descriptor = descriptor.with_units(units.clone());
        }
        Ok(descriptor)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

#[derive(Debug, Clone)]
enum Expr {
    Num(f64),
    /// Index into the input slots of the signature
    Var(usize),
    BinOp {
        op: char,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Neg(Box<Expr>),
}

fn tokenize(formula: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = formula.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(chars[i]));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // scientific notation: 1e-3, 2.5E4
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let num = text
                    .parse::<f64>()
                    .map_err(|_| Error::Formula(format!("invalid number: {}", text)))?;
                tokens.push(Token::Number(num));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            c => {
                return Err(Error::Formula(format!(
                    "unexpected character '{}' in formula",
                    c
                )));
            }
        }
    }

    Ok(tokens)
}

/// Deepest nesting of parentheses and unary signs a formula may use.
const MAX_DEPTH: usize = 64;
/// Longest formula, in tokens.
const MAX_TOKENS: usize = 4096;

/// Recursive descent parser; identifiers are interned into `slots`.
struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    coefficients: &'a BTreeMap<String, f64>,
    bands: Vec<String>,
    coefs_used: Vec<String>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn ident(&mut self, name: String) -> Expr {
        // Slot layout is resolved after parsing: bands first, then coefficients.
        if self.coefficients.contains_key(&name) {
            let idx = match self.coefs_used.iter().position(|n| *n == name) {
                Some(idx) => idx,
                None => {
                    self.coefs_used.push(name);
                    self.coefs_used.len() - 1
                }
            };
            Expr::Var(COEF_BASE + idx)
        } else {
            let idx = match self.bands.iter().position(|n| *n == name) {
                Some(idx) => idx,
                None => {
                    self.bands.push(name);
                    self.bands.len() - 1
                }
            };
            Expr::Var(idx)
        }
    }

    /// expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.parse_term()?;
            left = Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// term = factor (('*' | '/') factor)*
    fn parse_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_factor()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.parse_factor()?;
            left = Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// factor = number | ident | '(' expr ')' | ('-' | '+') factor
    fn parse_factor(&mut self) -> Result<Expr> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::Formula(format!(
                "formula nested deeper than {} levels",
                MAX_DEPTH
            )));
        }
        self.depth += 1;
        let factor = self.parse_nested();
        self.depth -= 1;
        factor
    }

    fn parse_nested(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Num(n)),
            Some(Token::Ident(name)) => Ok(self.ident(name)),
            Some(Token::LParen) => {
                let expr = self.parse_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err(Error::Formula("expected closing parenthesis".into())),
                }
            }
            Some(Token::Op('-')) => Ok(Expr::Neg(Box::new(self.parse_factor()?))),
            Some(Token::Op('+')) => self.parse_factor(),
            other => Err(Error::Formula(format!(
                "unexpected token in formula: {:?}",
                other
            ))),
        }
    }
}

const COEF_BASE: usize = 1 << 16;

fn relocate(expr: Expr, n_bands: usize) -> Expr {
    match expr {
        Expr::Var(idx) if idx >= COEF_BASE => Expr::Var(n_bands + idx - COEF_BASE),
        Expr::BinOp { op, left, right } => Expr::BinOp {
            op,
            left: Box::new(relocate(*left, n_bands)),
            right: Box::new(relocate(*right, n_bands)),
        },
        Expr::Neg(inner) => Expr::Neg(Box::new(relocate(*inner, n_bands))),
        other => other,
    }
}

fn eval(expr: &Expr, slots: &[f64]) -> f64 {
    match expr {
        Expr::Num(n) => *n,
        Expr::Var(idx) => slots[*idx],
        Expr::BinOp { op, left, right } => {
            let l = eval(left, slots);
            let r = eval(right, slots);
            match op {
                '+' => l + r,
                '-' => l - r,
                '*' => l * r,
                '/' => l / r,
                _ => f64::NAN,
            }
        }
        Expr::Neg(inner) => -eval(inner, slots),
    }
}

/// Inversion function evaluating a parsed formula pixel by pixel.
#[derive(Debug)]
pub struct FormulaFunction {
    name: String,
    source: String,
    expr: Expr,
    /// Band names, then coefficient names, matching the slots of `expr`
    slots: Vec<String>,
    n_bands: usize,
    signature: Signature,
}

impl FormulaFunction {
    pub fn parse(name: &str, formula: &str, coefficients: &BTreeMap<String, f64>) -> Result<Self> {
        let tokens = tokenize(formula)?;
        if tokens.is_empty() {
            return Err(Error::Formula(format!("empty formula for {}", name)));
        }
        if tokens.len() > MAX_TOKENS {
            return Err(Error::Formula(format!(
                "formula of {} exceeds {} tokens",
                name, MAX_TOKENS
            )));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            coefficients,
            bands: Vec::new(),
            coefs_used: Vec::new(),
            depth: 0,
        };
        let expr = parser.parse_expr()?;
        if let Some(extra) = parser.peek() {
            return Err(Error::Formula(format!(
                "unexpected trailing token in formula: {:?}",
                extra
            )));
        }
        if parser.bands.is_empty() {
            return Err(Error::Formula(format!(
                "formula of {} does not reference any band",
                name
            )));
        }

        let n_bands = parser.bands.len();
        let expr = relocate(expr, n_bands);

        let mut signature = Signature::new();
        for band in &parser.bands {
            signature = signature.band(band.clone());
        }
        // Declared coefficients stay overridable even when unused by the expression.
        for (coef, default) in coefficients {
            signature = signature.coefficient(coef.clone(), *default);
        }

        let mut slots = parser.bands;
        slots.extend(parser.coefs_used);

        Ok(Self {
            name: name.to_string(),
            source: formula.to_string(),
            expr,
            slots,
            n_bands,
            signature,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl InversionFunction for FormulaFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn invert(&self, inputs: &Inputs<'_>) -> Result<Array2<f64>> {
        let bands = self.slots[..self.n_bands]
            .iter()
            .map(|b| inputs.band(b))
            .collect::<Result<Vec<_>>>()?;
        let coefs = self.slots[self.n_bands..]
            .iter()
            .map(|c| inputs.coefficient(c))
            .collect::<Result<Vec<_>>>()?;

        let shape = bands[0].dim();
        for band in &bands[1..] {
            if band.dim() != shape {
                return Err(Error::ShapeMismatch {
                    expected: shape,
                    actual: band.dim(),
                });
            }
        }

        let mut slots = vec![0.0; self.slots.len()];
        slots[self.n_bands..].copy_from_slice(&coefs);

        let mut out = Array2::<f64>::zeros(shape);
        for ((row, col), value) in out.indexed_iter_mut() {
            for (slot, band) in slots.iter_mut().zip(&bands) {
                *slot = band[(row, col)];
            }
            *value = eval(&self.expr, &slots);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::collections::HashMap;

    fn coefs(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn nechad_formula_resolves_red_only() {
        let f = FormulaFunction::parse(
            "spm",
            "a * Red / (1 - Red / c)",
            &coefs(&[("a", 610.94), ("c", 0.2324)]),
        )
        .unwrap();
        assert_eq!(f.signature().required(), vec!["Red"]);

        let red = array![[0.05, 0.0]];
        let inputs = Inputs::new(
            HashMap::from([("Red".to_string(), &red)]),
            f.signature().defaults(),
        );
        let out = f.invert(&inputs).unwrap();
        assert!((out[(0, 0)] - 38.9206).abs() < 1e-3);
        assert_eq!(out[(0, 1)], 0.0);
    }

    #[test]
    fn bands_keep_first_appearance_order() {
        let f = FormulaFunction::parse("ndci", "(RedEdg1 - Red) / (RedEdg1 + Red)", &BTreeMap::new())
            .unwrap();
        assert_eq!(f.signature().required(), vec!["RedEdg1", "Red"]);

        let re = array![[0.3]];
        let red = array![[0.1]];
        let inputs = Inputs::new(
            HashMap::from([("RedEdg1".to_string(), &re), ("Red".to_string(), &red)]),
            HashMap::new(),
        );
        let out = f.invert(&inputs).unwrap();
        assert!((out[(0, 0)] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn precedence_and_unary_minus() {
        let f = FormulaFunction::parse("p", "-Red + 2 * 3e-1", &BTreeMap::new()).unwrap();
        let red = array![[1.0]];
        let inputs = Inputs::new(HashMap::from([("Red".to_string(), &red)]), HashMap::new());
        let out = f.invert(&inputs).unwrap();
        assert!((out[(0, 0)] - (-0.4)).abs() < 1e-12);
    }

    #[test]
    fn overridden_coefficient_is_used() {
        let spec = FormulaSpec {
            parameter: "scaled".into(),
            formula: "k * Green".into(),
            coefficients: coefs(&[("k", 2.0)]),
            units: Some("FNU".into()),
        };
        let descriptor = spec.to_descriptor().unwrap().with_coefficient("k", 10.0).unwrap();
        assert_eq!(descriptor.units(), "FNU");

        let green = array![[0.5]];
        let inputs = Inputs::new(
            HashMap::from([("Green".to_string(), &green)]),
            descriptor.coefficients(),
        );
        let out = descriptor.function().invert(&inputs).unwrap();
        assert_eq!(out[(0, 0)], 5.0);
    }

    #[test]
    fn malformed_formulas_are_rejected() {
        let none = BTreeMap::new();
        assert!(FormulaFunction::parse("x", "(Red + 1", &none).is_err());
        assert!(FormulaFunction::parse("x", "Red $ 2", &none).is_err());
        assert!(FormulaFunction::parse("x", "Red Green", &none).is_err());
        assert!(FormulaFunction::parse("x", "1 + 2", &none).is_err());
        assert!(FormulaFunction::parse("x", "", &none).is_err());
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let none = BTreeMap::new();
        let parens = format!("{}Red{}", "(".repeat(10_000), ")".repeat(10_000));
        let minus = format!("{}Red", "-".repeat(10_000));
        let chain = vec!["Red"; 5_000].join(" + ");
        for formula in [parens, minus, chain] {
            assert!(matches!(
                FormulaFunction::parse("x", &formula, &none),
                Err(Error::Formula(_))
            ));
        }

        let shallow = format!("{}Red{}", "(".repeat(20), ")".repeat(20));
        assert!(FormulaFunction::parse("x", &shallow, &none).is_ok());
    }
}
