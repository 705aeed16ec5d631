//! Emisión de pseudo-ensamblador x86 de 32 bits.
//!
//! Cada instrucción de IR se traduce de forma aislada, sin asignación
//! de registros: todo valor pasa por `eax` y vive en una ranura del
//! stack frame. Solo los temporales tienen ranura; una variable del
//! usuario se lee de `[ebp-0]`. El tamaño del frame se conoce hasta
//! traducir el cuerpo completo, por lo que el prólogo se arma al final.

use std::{
    collections::HashMap,
    fmt::{self, Display},
};

use crate::ir::{CompareOp, Instruction, Operand, Program, Temp};

pub mod frame;

use frame::{Frame, StringLabel, StringTable};

/// Comentario con el que inicia todo listado.
const HEADER: &str = "; Généré automatiquement par le compilateur";

/// Formato que recibe `printf` para mostrar un proverbio.
const PRINTF_FORMAT: &str = "printf_format";

/// Listado objetivo junto a las tablas con las que se construyó.
#[derive(Debug, Clone)]
pub struct TargetProgram {
    lines: Vec<String>,
    strings: StringTable,
    frame: Frame,
}

impl TargetProgram {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

impl Display for TargetProgram {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(fmt, "{}", line)?;
        }

        Ok(())
    }
}

/// Traduce un programa en IR.
pub fn emit(program: &Program) -> TargetProgram {
    let mut emitter = Emitter::default();
    for instruction in program.iter() {
        emitter.instruction(instruction);
    }

    emitter.finish()
}

/// Traduce un listado de IR en forma textual.
///
/// Las líneas en blanco se omiten y las que no son instrucciones válidas
/// se conservan como comentarios. Esta operación no falla.
pub fn emit_listing(text: &str) -> TargetProgram {
    let mut emitter = Emitter::default();
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match line.parse::<Instruction>() {
            Ok(instruction) => emitter.instruction(&instruction),
            Err(unrecognized) => emitter.line(format!("; {}", unrecognized)),
        }
    }

    emitter.finish()
}

#[derive(Default)]
struct Emitter {
    lines: Vec<String>,
    frame: Frame,
    strings: StringTable,

    // Búferes que contienen un literal conocido
    buffers: HashMap<Temp, StringLabel>,
    displays: bool,
}

impl Emitter {
    fn line(&mut self, line: String) {
        self.lines.push(line);
    }

    fn instruction(&mut self, instruction: &Instruction) {
        use Instruction::*;

        match instruction {
            Assign { dest, src } => {
                let src = self.operand(src);
                emit!(self, "mov", "eax, {}", src);

                let dest = self.frame.slot(*dest);
                emit!(self, "mov", "[ebp-{}], eax", dest);
            }

            CompareAssign { dest, lhs, op, rhs } => {
                let (lhs, rhs) = (self.operand(lhs), self.operand(rhs));
                let set = match op {
                    CompareOp::Equal => "sete",
                    CompareOp::Greater => "setg",
                    CompareOp::Less => "setl",
                };

                emit!(self, "mov", "eax, {}", lhs);
                emit!(self, "cmp", "eax, {}", rhs);
                emit!(self, set, "al");
                emit!(self, "movzx", "eax, al");

                let dest = self.frame.slot(*dest);
                emit!(self, "mov", "[ebp-{}], eax", dest);
            }

            JumpIfFalse(cond, label) => {
                let cond = self.frame.slot(*cond);
                emit!(self, "mov", "eax, [ebp-{}]", cond);
                emit!(self, "cmp", "eax, 0");
                emit!(self, "je", "{}", label);
            }

            SetLabel(label) => self.line(format!("{}:", label)),
            Jump(label) => emit!(self, "jmp", "{}", label),

            // Solo reserva la ranura; el contenido llega con `store_string`
            AllocBuffer(dest, _) => {
                self.frame.slot(*dest);
                self.buffers.remove(dest);
            }

            StoreString(dest, text) => {
                let label = self.strings.intern(text);
                self.buffers.insert(*dest, label);

                let dest = self.frame.slot(*dest);
                emit!(self, "mov", "dword [ebp-{}], {}", dest, label);
            }

            SyscallDisplay(src) => {
                self.displays = true;

                match self.buffers.get(src).copied() {
                    Some(label) => emit!(self, "push", "{}", label),
                    None => {
                        let src = self.frame.slot(*src);
                        emit!(self, "push", "dword [ebp-{}]", src);
                    }
                }

                emit!(self, "push", "{}", PRINTF_FORMAT);
                emit!(self, "call", "printf");
                emit!(self, "add", "esp, 8");
            }
        }
    }

    fn operand(&mut self, operand: &Operand) -> String {
        match operand {
            Operand::Temp(temp) => format!("[ebp-{}]", self.frame.slot(*temp)),
            Operand::Var(_) => String::from("[ebp-0]"),
            Operand::Int(integer) => integer.to_string(),
            Operand::Text(text) => self.strings.intern(text).to_string(),
        }
    }

    fn finish(mut self) -> TargetProgram {
        let body = std::mem::take(&mut self.lines);
        let frame_size = self.frame.size();

        for line in [HEADER, "section .text", "global _start", "extern printf, exit", "", "_start:"] {
            self.line(String::from(line));
        }

        emit!(self, "push", "ebp");
        emit!(self, "mov", "ebp, esp");
        emit!(self, "sub", "esp, {}", frame_size);

        self.lines.extend(body);

        emit!(self, "mov", "esp, ebp");
        emit!(self, "pop", "ebp");
        emit!(self, "mov", "eax, 1");
        emit!(self, "xor", "ebx, ebx");
        emit!(self, "int", "0x80");

        if self.displays || !self.strings.is_empty() {
            let data: Vec<String> = self
                .strings
                .iter()
                .map(|(label, text)| format!("{}: db \"{}\", 0", label, text))
                .collect();

            self.line(String::new());
            self.line(String::from("section .data"));
            self.line(format!("{}: db \"%s\", 10, 0", PRINTF_FORMAT));
            self.lines.extend(data);
        }

        log::debug!(
            "emitted {} lines, {} strings, frame of {} bytes",
            self.lines.len(),
            self.strings.len(),
            frame_size
        );

        TargetProgram {
            lines: self.lines,
            strings: self.strings,
            frame: self.frame,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn normalized(target: &TargetProgram) -> Vec<String> {
        target
            .lines()
            .iter()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect()
    }

    #[test]
    fn full_listing() {
        let program: Program = "t1 = age > 18\n\
                                ifFalse t1 goto L1\n\
                                t2 = allocate_buffer(256)\n\
                                store_string t2, \"THEME: X\"\n\
                                syscall display, t2\n\
                                label L1"
            .parse()
            .unwrap();

        let target = emit(&program);
        assert_eq!(
            normalized(&target),
            [
                "; Généré automatiquement par le compilateur",
                "section .text",
                "global _start",
                "extern printf, exit",
                "",
                "_start:",
                "push ebp",
                "mov ebp, esp",
                "sub esp, 12",
                "mov eax, [ebp-0]",
                "cmp eax, 18",
                "setg al",
                "movzx eax, al",
                "mov [ebp-12], eax",
                "mov eax, [ebp-12]",
                "cmp eax, 0",
                "je L1",
                "mov dword [ebp-16], str_0",
                "push str_0",
                "push printf_format",
                "call printf",
                "add esp, 8",
                "L1:",
                "mov esp, ebp",
                "pop ebp",
                "mov eax, 1",
                "xor ebx, ebx",
                "int 0x80",
                "",
                "section .data",
                "printf_format: db \"%s\", 10, 0",
                "str_0: db \"THEME: X\", 0",
            ]
        );

        assert_eq!(target.frame().offset(Temp(2)), Some(16));
        assert_eq!(target.lines()[9], "\tmov     eax, [ebp-0]");
    }

    #[test]
    fn string_comparison_and_deduplication() {
        let program: Program = "t1 = humeur == \"triste\"\n\
                                t2 = allocate_buffer(256)\n\
                                store_string t2, \"triste\"\n\
                                syscall display, t2\n\
                                t3 = t1"
            .parse()
            .unwrap();

        let target = emit(&program);
        let lines = normalized(&target);

        assert!(lines.contains(&String::from("cmp eax, str_0")));
        assert!(lines.contains(&String::from("sete al")));
        assert!(lines.contains(&String::from("mov eax, [ebp-12]")));
        assert!(lines.contains(&String::from("mov [ebp-20], eax")));
        assert_eq!(target.strings().len(), 1);
        assert_eq!(target.frame().size(), 16);
    }

    #[test]
    fn display_without_known_string() {
        let target = emit_listing("syscall display, t4");
        let lines = normalized(&target);

        assert!(lines.contains(&String::from("push dword [ebp-24]")));
        assert!(lines.contains(&String::from("printf_format: db \"%s\", 10, 0")));
        assert!(target.strings().is_empty());
    }

    #[test]
    fn listing_never_fails() {
        let target = emit_listing("\n   \nbonjour\ngoto L2\nlabel L2\n");
        let lines = normalized(&target);

        assert!(lines.contains(&String::from("; Instruction non reconnue: bonjour")));
        assert!(lines.contains(&String::from("jmp L2")));
        assert!(lines.contains(&String::from("L2:")));
        assert!(lines.contains(&String::from("sub esp, 0")));

        // Sin cadenas ni llamadas no hay sección de datos
        assert!(!lines.contains(&String::from("section .data")));
    }

    #[test]
    fn out_of_range_temps_become_comments() {
        let target = emit_listing("t4294967295 = 1\nsyscall display, t1073741823");
        let lines = normalized(&target);

        assert!(lines.contains(&String::from("; Instruction non reconnue: t4294967295 = 1")));
        assert!(lines.contains(&String::from(
            "; Instruction non reconnue: syscall display, t1073741823"
        )));
        assert!(target.frame().iter().next().is_none());
    }

    #[test]
    fn deepest_readable_temp_fits_the_frame() {
        let target = emit_listing(&format!("t{} = 1", crate::ir::MAX_TEMP));
        let lines = normalized(&target);

        assert!(lines.contains(&String::from("mov [ebp-4294967288], eax")));
        assert_eq!(target.frame().size(), u32::MAX - 3 - 8);
    }
}
