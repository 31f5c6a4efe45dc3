//! Built-in grammar rules. Registry order is the order of `all()`.

use super::keywords::inside_command;
use super::{Rule, RuleDoc, ScalarArgs, Slot, SlotKind};
use crate::error::ComputeError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Index-token syntax inside rule patterns.
pub(crate) const TOKEN: &str = r"@/\d+/@";

fn compile(pattern: &str) -> Regex {
    Regex::new(&pattern.replace("{T}", TOKEN)).expect("BUG: built-in rule pattern must compile")
}

static SQRT: Lazy<Regex> = Lazy::new(|| compile(r"\\sqrt(?:\[(?P<degree>{T})\])?(?P<value>{T})"));
static FRACTION: Lazy<Regex> = Lazy::new(|| compile(r"\\frac(?P<numerator>{T})(?P<denominator>{T})"));
static LOGARITHM: Lazy<Regex> =
    Lazy::new(|| compile(r"\\(?P<function>lg|ln|log)(?:_(?P<base>{T}|[0-9.]+))?(?P<parameter>{T})"));
static TRIG: Lazy<Regex> = Lazy::new(|| {
    compile(r"\\(?P<function>sinh|cosh|tanh|coth|sech|csch|sin|cos|tan|cot|sec|csc)(?P<parameter>{T})")
});
static INVERSE_TRIG: Lazy<Regex> =
    Lazy::new(|| compile(r"\\(?P<function>arcsin|arccos|arctan|arccot|arcsec|arccsc)(?P<parameter>{T})"));
static EXPONENTIATION: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?P<value>{T}|\\(?:pi|Phi|Omega)|[0-9.]+|[A-Za-z])\^(?P<exponent>{T}|[0-9])")
});
static CONSTANT: Lazy<Regex> = Lazy::new(|| compile(r"(?P<value>[0-9.]+)"));

const LOG_FUNCTIONS: &[&str] = &["lg", "ln", "log"];
const TRIG_FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "cot", "sec", "csc", "sinh", "cosh", "tanh", "coth", "sech", "csch",
];
const INVERSE_TRIG_FUNCTIONS: &[&str] = &["arcsin", "arccos", "arctan", "arccot", "arcsec", "arccsc"];

pub fn all() -> Vec<Rule> {
    vec![sqrt(), fraction(), logarithm(), trig(), inverse_trig(), exponentiation(), constant()]
}

pub fn sqrt() -> Rule {
    Rule::new(
        "Sqrt",
        SQRT.clone(),
        vec![
            Slot::new("degree", SlotKind::LiteralOrIndex).with_default(2.0),
            Slot::new("value", SlotKind::LiteralOrIndex),
        ],
        RuleDoc::new("Root", "\\sqrt[n]{x}", "n-th root of x, square root when [n] is omitted"),
        |args| root(args.value(0), args.value(1)),
    )
}

fn root(degree: f64, value: f64) -> Result<f64, ComputeError> {
    let odd = degree.fract() == 0.0 && degree.rem_euclid(2.0) == 1.0;
    if degree <= 0.0 || (value < 0.0 && !odd) {
        return Err(ComputeError::SqrtOfNegativeValue { degree, value });
    }
    let magnitude = match degree {
        d if d == 2.0 => value.abs().sqrt(),
        d if d == 3.0 => value.abs().cbrt(),
        d => value.abs().powf(d.recip()),
    };
    Ok(if value < 0.0 { -magnitude } else { magnitude })
}

pub fn fraction() -> Rule {
    Rule::new(
        "Fraction",
        FRACTION.clone(),
        vec![
            Slot::new("numerator", SlotKind::LiteralOrIndex),
            Slot::new("denominator", SlotKind::LiteralOrIndex),
        ],
        RuleDoc::new("Fraction", "\\frac{a}{b}", "a divided by b"),
        |args| {
            let (numerator, denominator) = (args.value(0), args.value(1));
            if denominator == 0.0 {
                return Err(ComputeError::DivisionByZero { numerator });
            }
            Ok(numerator / denominator)
        },
    )
}

pub fn logarithm() -> Rule {
    Rule::new(
        "Logarithm",
        LOGARITHM.clone(),
        vec![
            Slot::new("base", SlotKind::LiteralOrIndex).optional(),
            Slot::new("parameter", SlotKind::LiteralOrIndex),
        ],
        RuleDoc::new("Logarithm", "\\log_{b}{x}, \\lg{x}, \\ln{x}", "Logarithm of x to base b, 10 or e"),
        logarithm_value,
    )
    .with_selector("function", LOG_FUNCTIONS)
}

fn logarithm_value(args: &ScalarArgs<'_>) -> Result<f64, ComputeError> {
    let x = args.value(1);
    match (args.selector.unwrap_or_default(), args.get(0)) {
        ("log", Some(base)) => Ok(x.ln() / base.ln()),
        ("lg", None) => Ok(x.log10()),
        ("ln", None) => Ok(x.ln()),
        (function, _) => Err(ComputeError::IncorrectLogarithm { function: function.to_string() }),
    }
}

pub fn trig() -> Rule {
    Rule::new(
        "Trigonometry",
        TRIG.clone(),
        vec![Slot::new("parameter", SlotKind::LiteralOrIndex)],
        RuleDoc::new(
            "Trigonometry",
            "\\sin{x}, \\cosh{x}",
            "sin cos tan cot sec csc and their hyperbolic forms, x in radians",
        ),
        |args| {
            let x = args.value(0);
            Ok(match args.selector.unwrap_or_default() {
                "sin" => x.sin(),
                "cos" => x.cos(),
                "tan" => x.tan(),
                "cot" => x.tan().recip(),
                "sec" => x.cos().recip(),
                "csc" => x.sin().recip(),
                "sinh" => x.sinh(),
                "cosh" => x.cosh(),
                "tanh" => x.tanh(),
                "coth" => x.tanh().recip(),
                "sech" => x.cosh().recip(),
                "csch" => x.sinh().recip(),
                other => return Err(ComputeError::UnknownFunction { name: other.to_string() }),
            })
        },
    )
    .with_selector("function", TRIG_FUNCTIONS)
}

pub fn inverse_trig() -> Rule {
    Rule::new(
        "InverseTrigonometry",
        INVERSE_TRIG.clone(),
        vec![Slot::new("parameter", SlotKind::LiteralOrIndex)],
        RuleDoc::new("Inverse trigonometry", "\\arcsin{x}", "arcsin arccos arctan arccot arcsec arccsc, in radians"),
        |args| {
            let x = args.value(0);
            Ok(match args.selector.unwrap_or_default() {
                "arcsin" => x.asin(),
                "arccos" => x.acos(),
                "arctan" => x.atan(),
                "arccot" => std::f64::consts::FRAC_PI_2 - x.atan(),
                "arcsec" => x.recip().acos(),
                "arccsc" => x.recip().asin(),
                other => return Err(ComputeError::UnknownFunction { name: other.to_string() }),
            })
        },
    )
    .with_selector("function", INVERSE_TRIG_FUNCTIONS)
}

pub fn exponentiation() -> Rule {
    Rule::new(
        "Exponentiation",
        EXPONENTIATION.clone(),
        vec![
            Slot::new("value", SlotKind::Any),
            Slot::new("exponent", SlotKind::LiteralOrIndex),
        ],
        RuleDoc::new("Exponentiation", "x^{y}, x^2", "x raised to the power y"),
        |args| {
            let (base, exponent) = (args.value(0), args.value(1));
            if exponent.fract() == 0.0 && exponent.abs() <= i32::MAX as f64 {
                Ok(base.powi(exponent as i32))
            } else {
                Ok(base.powf(exponent))
            }
        },
    )
    .with_guard(|context, start| {
        let bytes = context.as_bytes();
        let after_subscript = start > 0 && bytes[start - 1] == b'_';
        let letter_in_command = bytes[start].is_ascii_alphabetic() && inside_command(context, start);
        !after_subscript && !letter_in_command
    })
}

pub fn constant() -> Rule {
    Rule::new(
        "Constant",
        CONSTANT.clone(),
        vec![Slot::new("value", SlotKind::LiteralOnly)],
        RuleDoc::new("Number", "3.14", "Decimal literal"),
        |args| Ok(args.value(0)),
    )
    .with_guard(|context, start| {
        start == 0 || !matches!(context.as_bytes()[start - 1], b'@' | b'/' | b'0'..=b'9')
    })
}
