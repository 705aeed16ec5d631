//! Representación intermedia de código de tres direcciones.
//!
//! Un [`Program`] es una secuencia plana de instrucciones. Cada
//! instrucción tiene a lo sumo un operador, y todo resultado intermedio
//! vive en un temporal `t<N>`. Los temporales y las etiquetas `L<N>` se
//! numeran desde 1 en cada generación.
//!
//! Toda instrucción tiene una forma textual canónica ([`Display`]) que
//! se puede volver a leer con [`FromStr`]:
//!
//! ```text
//! t1 = age > 18
//! t1 = humeur == "triste"
//! t3 = t1
//! ifFalse t1 goto L1
//! goto L1
//! label L1
//! t2 = allocate_buffer(256)
//! store_string t2, "CONSEIL: ..."
//! syscall display, t2
//! ```

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use thiserror::Error;

use crate::lex::Identifier;

mod lower;
mod peephole;

/// Capacidad del búfer que se reserva por cada proverbio mostrado.
pub const BUFFER_SIZE: u32 = 256;

/// Mayor temporal cuya ranura de stack, `[ebp-4*(N+2)]` más su ancho,
/// todavía cabe en un desplazamiento de 32 bits.
pub const MAX_TEMP: u32 = (u32::MAX - 4) / 4 - 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Temp(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl Display for Temp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "t{}", self.0)
    }
}

impl Display for Label {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "L{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equal,
    Greater,
    Less,
}

impl Display for CompareOp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            CompareOp::Equal => "==",
            CompareOp::Greater => ">",
            CompareOp::Less => "<",
        };

        fmt.write_str(op)
    }
}

/// Lado de una asignación o comparación.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Temp(Temp),
    Var(Identifier),
    Int(i64),
    Text(String),
}

impl Display for Operand {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Temp(temp) => write!(fmt, "{}", temp),
            Operand::Var(var) => write!(fmt, "{}", var),
            Operand::Int(integer) => write!(fmt, "{}", integer),
            Operand::Text(text) => write!(fmt, "\"{}\"", text),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Assign {
        dest: Temp,
        src: Operand,
    },

    CompareAssign {
        dest: Temp,
        lhs: Operand,
        op: CompareOp,
        rhs: Operand,
    },

    JumpIfFalse(Temp, Label),
    SetLabel(Label),
    Jump(Label),
    AllocBuffer(Temp, u32),
    StoreString(Temp, String),
    SyscallDisplay(Temp),
}

impl Display for Instruction {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match self {
            Assign { dest, src } => write!(fmt, "{} = {}", dest, src),
            CompareAssign { dest, lhs, op, rhs } => write!(fmt, "{} = {} {} {}", dest, lhs, op, rhs),
            JumpIfFalse(cond, label) => write!(fmt, "ifFalse {} goto {}", cond, label),
            SetLabel(label) => write!(fmt, "label {}", label),
            Jump(label) => write!(fmt, "goto {}", label),
            AllocBuffer(dest, size) => write!(fmt, "{} = allocate_buffer({})", dest, size),
            StoreString(dest, text) => write!(fmt, "store_string {}, \"{}\"", dest, text),
            SyscallDisplay(src) => write!(fmt, "syscall display, {}", src),
        }
    }
}

/// Una línea de IR textual que no corresponde a ninguna instrucción.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Instruction non reconnue: {0}")]
pub struct Unrecognized(pub String);

impl FromStr for Instruction {
    type Err = Unrecognized;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        read_instruction(line).ok_or_else(|| Unrecognized(line.to_owned()))
    }
}

fn read_instruction(line: &str) -> Option<Instruction> {
    use Instruction::*;

    if let Some(rest) = line.strip_prefix("ifFalse ") {
        let (cond, label) = rest.split_once(" goto ")?;
        return Some(JumpIfFalse(read_temp(cond.trim())?, read_label(label.trim())?));
    }

    if let Some(label) = line.strip_prefix("goto ") {
        return read_label(label.trim()).map(Jump);
    }

    if let Some(label) = line.strip_prefix("label ") {
        return read_label(label.trim()).map(SetLabel);
    }

    if let Some(rest) = line.strip_prefix("store_string ") {
        let (dest, text) = rest.split_once(',')?;
        return Some(StoreString(read_temp(dest.trim())?, read_quoted(text.trim())?.to_owned()));
    }

    if let Some(src) = line.strip_prefix("syscall display,") {
        return read_temp(src.trim()).map(SyscallDisplay);
    }

    let (dest, expr) = line.split_once(" = ")?;
    let dest = read_temp(dest.trim())?;
    let expr = expr.trim();

    if let Some(size) = expr
        .strip_prefix("allocate_buffer(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return Some(AllocBuffer(dest, size.trim().parse().ok()?));
    }

    // El lado izquierdo de una comparación nunca contiene espacios
    match expr.split_once(' ') {
        None => Some(Assign {
            dest,
            src: read_operand(expr)?,
        }),

        Some((lhs, rest)) => {
            let (op, rhs) = rest.split_once(' ')?;
            let op = match op {
                "==" => CompareOp::Equal,
                ">" => CompareOp::Greater,
                "<" => CompareOp::Less,
                _ => return None,
            };

            Some(CompareAssign {
                dest,
                lhs: read_operand(lhs)?,
                op,
                rhs: read_operand(rhs.trim())?,
            })
        }
    }
}

fn read_temp(text: &str) -> Option<Temp> {
    read_numbered(text, 't')
        .filter(|&temp| temp <= MAX_TEMP)
        .map(Temp)
}

fn read_label(text: &str) -> Option<Label> {
    read_numbered(text, 'L').map(Label)
}

fn read_numbered(text: &str, prefix: char) -> Option<u32> {
    let digits = text.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok()
}

fn read_quoted(text: &str) -> Option<&str> {
    text.strip_prefix('"')?.strip_suffix('"')
}

fn read_operand(text: &str) -> Option<Operand> {
    if let Some(text) = read_quoted(text) {
        return Some(Operand::Text(text.to_owned()));
    }

    if let Ok(integer) = text.parse() {
        return Some(Operand::Int(integer));
    }

    if let Some(temp) = read_temp(text) {
        return Some(Operand::Temp(temp));
    }

    let is_name = !text.is_empty()
        && !text.starts_with(|c: char| c.is_ascii_digit())
        && text.chars().all(|c| c.is_alphanumeric() || c == '_');

    is_name.then(|| Operand::Var(Identifier::new(text)))
}

/// Una secuencia de instrucciones de tres direcciones.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program(Vec<Instruction>);

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Program(instructions)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Instruction> for Program {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Program(iter.into_iter().collect())
    }
}

impl Display for Program {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in self.iter() {
            writeln!(fmt, "{}", instruction)?;
        }

        Ok(())
    }
}

impl FromStr for Program {
    type Err = Unrecognized;

    /// Lee un listado completo; las líneas en blanco se ignoran.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(Instruction::from_str)
            .collect()
    }
}
