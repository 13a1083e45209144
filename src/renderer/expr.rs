//! Combiner formula expression tree.
//!
//! Formulas are built as a small tree of operand reads and shape nodes, then
//! either evaluated on the host or rendered to WGSL. Both walks share the same
//! tree, so the emitted program and the host reference cannot drift apart.

use crate::combiner::{ALPHA, COLOR, CombinerFormula, FormulaShape, Operand};

use super::types::{TypedExpr, ValueType};
use super::utils::fmt_f32;

/// Channel mode a formula is evaluated in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelMode {
    /// Four channels with real alpha.
    Rgba,
    /// Color only. Operands keep their alpha only when the combiner alpha test is on.
    Rgb { alpha_test: bool },
    /// Every operand reads as its alpha scalar.
    AlphaOnly,
}

/// How an operand's source value is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Read {
    Rgba,
    /// RGB with alpha forced to one.
    OpaqueAlpha,
    /// Alpha as a scalar.
    Alpha,
    /// Alpha broadcast to four channels.
    BroadcastAlpha,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Scalar(f32),
    Vec4([f32; 4]),
}

impl Value {
    pub fn ty(self) -> ValueType {
        match self {
            Value::Scalar(_) => ValueType::F32,
            Value::Vec4(_) => ValueType::Vec4,
        }
    }

    pub fn component(self, index: usize) -> f32 {
        match self {
            Value::Scalar(v) => v,
            Value::Vec4(v) => v[index],
        }
    }

    fn zip(self, other: Value, f: impl Fn(f32, f32) -> f32) -> Value {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Value::Scalar(f(a, b)),
            (a, b) => Value::Vec4(std::array::from_fn(|i| f(a.component(i), b.component(i)))),
        }
    }
}

/// Host mirror of the WGSL `CombinerInputs` struct.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CombinerInputs {
    /// `inputs[n - 1]` holds `Input(n)`.
    pub inputs: [[f32; 4]; 4],
    pub texel0: [f32; 4],
    pub texel1: [f32; 4],
}

impl CombinerInputs {
    fn source(&self, operand: Operand) -> [f32; 4] {
        match operand {
            Operand::Zero => [0.0; 4],
            Operand::Input(n) => self.inputs[usize::from(n.clamp(1, 4)) - 1],
            Operand::Texel0 | Operand::Texel0Alpha => self.texel0,
            Operand::Texel1 => self.texel1,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Const(Value),
    Read { operand: Operand, read: Read },
    Mul(Box<Expr>, Box<Expr>),
    /// `from * (1 - t) + to * t`
    Lerp { from: Box<Expr>, to: Box<Expr>, t: Box<Expr> },
    /// `(a - b) * factor + add`
    SubMulAdd { a: Box<Expr>, b: Box<Expr>, factor: Box<Expr>, add: Box<Expr> },
    /// One component of a vector; scalars pass through.
    Component { value: Box<Expr>, index: usize },
    /// `vec4(rgb.rgb, alpha)`
    Combine { rgb: Box<Expr>, alpha: Box<Expr> },
}

impl Expr {
    pub fn ty(&self) -> ValueType {
        match self {
            Expr::Const(v) => v.ty(),
            Expr::Read { read, .. } => match read {
                Read::Alpha => ValueType::F32,
                _ => ValueType::Vec4,
            },
            Expr::Mul(a, b) => widest(a.ty(), b.ty()),
            Expr::Lerp { from, to, .. } => widest(from.ty(), to.ty()),
            Expr::SubMulAdd { a, b, add, .. } => widest(widest(a.ty(), b.ty()), add.ty()),
            Expr::Component { .. } => ValueType::F32,
            Expr::Combine { .. } => ValueType::Vec4,
        }
    }

    pub fn eval(&self, inputs: &CombinerInputs) -> Value {
        match self {
            Expr::Const(v) => *v,
            Expr::Read { operand, read } => {
                let src = inputs.source(*operand);
                match read {
                    Read::Rgba => Value::Vec4(src),
                    Read::OpaqueAlpha => Value::Vec4([src[0], src[1], src[2], 1.0]),
                    Read::Alpha => Value::Scalar(src[3]),
                    Read::BroadcastAlpha => Value::Vec4([src[3]; 4]),
                }
            }
            Expr::Mul(a, b) => a.eval(inputs).zip(b.eval(inputs), |x, y| x * y),
            Expr::Lerp { from, to, t } => {
                let (from, to, t) = (from.eval(inputs), to.eval(inputs), t.eval(inputs));
                let lerp = |i: usize| {
                    let t = t.component(i);
                    from.component(i) * (1.0 - t) + to.component(i) * t
                };
                match (from, to) {
                    (Value::Scalar(_), Value::Scalar(_)) if t.ty() == ValueType::F32 => {
                        Value::Scalar(lerp(0))
                    }
                    _ => Value::Vec4(std::array::from_fn(lerp)),
                }
            }
            Expr::SubMulAdd { a, b, factor, add } => {
                let diff = a.eval(inputs).zip(b.eval(inputs), |x, y| x - y);
                let scaled = diff.zip(factor.eval(inputs), |x, f| x * f);
                scaled.zip(add.eval(inputs), |x, y| x + y)
            }
            Expr::Component { value, index } => Value::Scalar(value.eval(inputs).component(*index)),
            Expr::Combine { rgb, alpha } => {
                let rgb = rgb.eval(inputs);
                let alpha = alpha.eval(inputs).component(3);
                Value::Vec4([rgb.component(0), rgb.component(1), rgb.component(2), alpha])
            }
        }
    }

    /// Render to WGSL. Operands read from a `CombinerInputs` value named `ci`.
    pub fn to_wgsl(&self) -> TypedExpr {
        let expr = match self {
            Expr::Const(Value::Scalar(v)) => fmt_f32(*v),
            Expr::Const(Value::Vec4(v)) => format!(
                "vec4f({}, {}, {}, {})",
                fmt_f32(v[0]),
                fmt_f32(v[1]),
                fmt_f32(v[2]),
                fmt_f32(v[3])
            ),
            Expr::Read { operand, read } => {
                let src = operand_source(*operand);
                match read {
                    Read::Rgba => src,
                    Read::OpaqueAlpha => format!("vec4f({src}.rgb, 1.0)"),
                    Read::Alpha => format!("{src}.a"),
                    Read::BroadcastAlpha => format!("vec4f({src}.a)"),
                }
            }
            Expr::Mul(a, b) => format!("({} * {})", a.to_wgsl().expr, b.to_wgsl().expr),
            Expr::Lerp { from, to, t } => {
                let t_wgsl = t.to_wgsl();
                let t_expr = if self.ty() == ValueType::Vec4 && t_wgsl.ty == ValueType::F32 {
                    format!("vec4f({})", t_wgsl.expr)
                } else {
                    t_wgsl.expr
                };
                format!("mix({}, {}, {})", from.to_wgsl().expr, to.to_wgsl().expr, t_expr)
            }
            Expr::SubMulAdd { a, b, factor, add } => format!(
                "(({} - {}) * {} + {})",
                a.to_wgsl().expr,
                b.to_wgsl().expr,
                factor.to_wgsl().expr,
                add.to_wgsl().expr
            ),
            Expr::Component { value, index } => {
                let inner = value.to_wgsl();
                match inner.ty {
                    ValueType::F32 => inner.expr,
                    ValueType::Vec4 => format!("{}.{}", inner.expr, ["x", "y", "z", "w"][*index]),
                }
            }
            Expr::Combine { rgb, alpha } => {
                let alpha = alpha.to_wgsl();
                let alpha = match alpha.ty {
                    ValueType::F32 => alpha.expr,
                    ValueType::Vec4 => format!("{}.a", alpha.expr),
                };
                format!("vec4f({}.rgb, {alpha})", rgb.to_wgsl().expr)
            }
        };
        TypedExpr::new(expr, self.ty())
    }
}

fn widest(a: ValueType, b: ValueType) -> ValueType {
    if a == ValueType::Vec4 || b == ValueType::Vec4 {
        ValueType::Vec4
    } else {
        ValueType::F32
    }
}

fn operand_source(operand: Operand) -> String {
    match operand {
        Operand::Zero => "vec4f(0.0)".to_string(),
        Operand::Input(n) => format!("ci.input_{}", n.clamp(1, 4)),
        Operand::Texel0 | Operand::Texel0Alpha => "ci.texel0".to_string(),
        Operand::Texel1 => "ci.texel1".to_string(),
    }
}

/// Expression for one operand slot. `as_factor` marks the multiplicative slot,
/// where a lone texel0 alpha stays scalar.
pub fn operand_expr(operand: Operand, mode: ChannelMode, as_factor: bool) -> Expr {
    match mode {
        ChannelMode::AlphaOnly => match operand {
            Operand::Zero => Expr::Const(Value::Scalar(0.0)),
            Operand::Texel0Alpha => Expr::Read { operand: Operand::Texel0, read: Read::Alpha },
            other => Expr::Read { operand: other, read: Read::Alpha },
        },
        ChannelMode::Rgba | ChannelMode::Rgb { .. } => match operand {
            Operand::Zero => {
                let alpha = if mode == ChannelMode::Rgba { 0.0 } else { 1.0 };
                Expr::Const(Value::Vec4([0.0, 0.0, 0.0, alpha]))
            }
            Operand::Texel0Alpha => Expr::Read {
                operand: Operand::Texel0,
                read: if as_factor { Read::Alpha } else { Read::BroadcastAlpha },
            },
            other => {
                let read = match mode {
                    ChannelMode::Rgb { alpha_test: false } => Read::OpaqueAlpha,
                    _ => Read::Rgba,
                };
                Expr::Read { operand: other, read }
            }
        },
    }
}

/// Expression for one channel's equation, using the formula's shape for that channel.
pub fn channel_expr(formula: &CombinerFormula, channel: usize, mode: ChannelMode) -> Expr {
    let s = &formula.slots[channel];
    let op = |i: usize| Box::new(operand_expr(s[i], mode, false));
    let factor = || Box::new(operand_expr(s[2], mode, true));
    match formula.shape(channel) {
        FormulaShape::Single => operand_expr(s[3], mode, false),
        FormulaShape::Multiply => Expr::Mul(op(0), factor()),
        FormulaShape::Mix => Expr::Lerp {
            from: op(1),
            to: op(0),
            t: factor(),
        },
        // The factor is reduced to its first channel. With a vector factor the
        // with-alpha pass scales alpha by x while the alpha-only pass uses w.
        // Kept as is pending product-owner confirmation.
        FormulaShape::General => Expr::SubMulAdd {
            a: op(0),
            b: op(1),
            factor: Box::new(Expr::Component {
                value: factor(),
                index: 0,
            }),
            add: op(3),
        },
    }
}

/// Final RGBA of the combiner.
pub fn combiner_color_expr(formula: &CombinerFormula) -> Expr {
    if formula.color_alpha_same {
        channel_expr(formula, COLOR, ChannelMode::Rgba)
    } else {
        split_color_expr(formula)
    }
}

/// RGB and alpha evaluated separately and recombined.
pub fn split_color_expr(formula: &CombinerFormula) -> Expr {
    Expr::Combine {
        rgb: Box::new(channel_expr(
            formula,
            COLOR,
            ChannelMode::Rgb {
                alpha_test: formula.flags.alpha_test,
            },
        )),
        alpha: Box::new(channel_expr(formula, ALPHA, ChannelMode::AlphaOnly)),
    }
}

/// Alpha only, as needed by the shadow program.
pub fn combiner_alpha_expr(formula: &CombinerFormula) -> Expr {
    if formula.color_alpha_same {
        Expr::Component {
            value: Box::new(channel_expr(formula, COLOR, ChannelMode::Rgba)),
            index: 3,
        }
    } else {
        channel_expr(formula, ALPHA, ChannelMode::AlphaOnly)
    }
}

/// WGSL declarations of `CombinerInputs`, `combine_color` and `combine_alpha`.
pub fn wgsl_combiner_functions(formula: &CombinerFormula) -> String {
    let color = combiner_color_expr(formula).to_wgsl();
    let alpha = combiner_alpha_expr(formula).to_wgsl();
    format!(
        r#"
struct CombinerInputs {{
    input_1: vec4f,
    input_2: vec4f,
    input_3: vec4f,
    input_4: vec4f,
    texel0: vec4f,
    texel1: vec4f,
}};

fn combine_color(ci: CombinerInputs) -> vec4f {{
    return {};
}}

fn combine_alpha(ci: CombinerInputs) -> f32 {{
    return {};
}}
"#,
        color.expr, alpha.expr
    )
}
