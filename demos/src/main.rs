//! Demonstration binaries mirroring the original driver scripts (`demo2.py`,
//! `demo3.py`, `demo4.py`, `demo_perlin.py`): each builds one circuit
//! end-to-end against `arc_dsl::Session` and prints the emitted text.
//!
//! Not part of the library's public surface — see `arc_dsl`'s crate docs for
//! the builder API these demos exercise.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::info;

use arc_dsl::{CallOutput, DslError, Expr, ExternTemplate, InputArg, Output, Session, Shape};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Demo {
    /// `a` public, `b` private; divide and mod `a` by the constant 2,
    /// reintroduce soundness with two `check_equals` calls.
    DivMod,
    /// `a`, `b` private; witness-world division by another signal
    /// (`a / b`), the "modular inverse" idiom.
    ModInverse,
    /// Bounded division plus a `LessThan` extern call, matching the
    /// original's range-checked remainder.
    BoundedDiv,
    /// Two independent `is_negative` computations, each chaining a
    /// `Num2Bits` extern's vector output straight into a `Sign` extern's
    /// vector input: duplicate template instantiation and array-to-array
    /// wiring in one circuit.
    BitsSign,
}

#[derive(Parser)]
#[clap(name = "arc-dsl-demos", about = "Emit a sample Circom program built with arc-dsl")]
struct Args {
    /// Which demo circuit to build.
    #[clap(value_enum)]
    demo: Demo,

    /// Write the emitted text here instead of stdout.
    #[clap(short, long)]
    out: Option<PathBuf>,
}

fn build_div_mod() -> Result<(Session, Expr), DslError> {
    let session = Session::new();
    let a = session.input("a", false)?;
    let b = session.input("b", true)?;

    let c = a.detach()?.div(2)?.attach()?;
    let d = a.detach()?.rem(2)?.attach()?;

    a.check_equals(c.mul(2)?.add(&d)?)?;
    let one_minus_d = session.constant(1).sub(&d)?;
    d.mul(&one_minus_d)?.check_equals(0)?;

    let output = d.add(&b)?.add(2)?;
    Ok((session, output))
}

fn build_mod_inverse() -> Result<(Session, Expr), DslError> {
    let session = Session::new();
    let a = session.input("a", false)?;
    let b = session.input("b", true)?;

    let c = a.detach()?.div(&b)?.attach()?;
    a.check_equals(b.mul(&c)?)?;

    Ok((session, c))
}

fn build_bounded_div() -> Result<(Session, Expr), DslError> {
    let session = Session::new();
    let dividend = session.input("dividend", false)?;
    let divisor = session.input("divisor", true)?;

    let remainder = dividend.detach()?.rem(&divisor)?.attach()?;
    let quotient = dividend.detach()?.sub(&remainder)?.div(&divisor)?.attach()?;
    dividend.check_equals(divisor.mul(&quotient)?.add(&remainder)?)?;

    session.include("circomlib/circuits/comparators.circom");
    let less_than = session.r#extern(
        "LessThan",
        vec![("in", Shape::Vector(2))],
        Output::Scalar("out".to_string()),
        vec![8],
    )?;
    match less_than.call(vec![("in", InputArg::vector([remainder.clone(), divisor.clone()]))])? {
        CallOutput::Scalar(out) => out.check_equals(1)?,
        _ => unreachable!("LessThan was declared with a scalar output"),
    }

    Ok((session, remainder))
}

fn is_negative(num2bits: &ExternTemplate, sign: &ExternTemplate, v: &Expr) -> Result<Expr, DslError> {
    let bits = match num2bits.call(vec![("in", InputArg::scalar(v))])? {
        CallOutput::Array(bits) => bits,
        _ => unreachable!("Num2Bits was declared with a vector output"),
    };
    match sign.call(vec![("in", InputArg::array(bits))])? {
        CallOutput::Scalar(out) => Ok(out),
        _ => unreachable!("Sign was declared with a scalar output"),
    }
}

fn build_bits_sign() -> Result<(Session, Expr), DslError> {
    let session = Session::new();
    let x = session.input("x", false)?;
    let y = session.input("y", false)?;

    session.include("circomlib/circuits/bitify.circom");
    let num2bits = session.r#extern(
        "Num2Bits",
        vec![("in", Shape::Scalar)],
        Output::Vector("out".to_string()),
        vec![254],
    )?;

    session.include("circomlib/circuits/sign.circom");
    let sign = session.r#extern(
        "Sign",
        vec![("in", Shape::Vector(254))],
        Output::Scalar("sign".to_string()),
        vec![],
    )?;

    let neg_x = is_negative(&num2bits, &sign, &x)?;
    let neg_y = is_negative(&num2bits, &sign, &y)?;
    let output = neg_x.add(&neg_y)?;

    Ok((session, output))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let (session, output) = match args.demo {
        Demo::DivMod => build_div_mod()?,
        Demo::ModInverse => build_mod_inverse()?,
        Demo::BoundedDiv => build_bounded_div()?,
        Demo::BitsSign => build_bits_sign()?,
    };

    let text = session.generate(&output)?;
    info!("emitted {} byte(s) of circuit text", text.len());

    match args.out {
        Some(path) => fs::write(&path, text)?,
        None => print!("{text}"),
    }

    Ok(())
}
