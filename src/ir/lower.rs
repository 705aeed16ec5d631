//! Traducción del AST a código de tres direcciones.
//!
//! Una condición simple abre una etiqueta de fin, compara, salta a esa
//! etiqueta si la comparación es falsa, emite sus acciones y cierra la
//! etiqueta. Un `sinon si` reutiliza la etiqueta de fin de la cadena que
//! siga abierta y nunca cierra una propia, por lo que su cuerpo cae
//! directamente a lo que venga después. Como la gramática no anida
//! condiciones, una cadena solo está abierta mientras se emiten las
//! acciones de una condición simple; un `sinon si` de primer nivel
//! siempre obtiene una etiqueta nueva que nadie coloca.

use super::{CompareOp, Instruction, Label, Operand, Program, Temp, BUFFER_SIZE};
use crate::{
    lex::Identifier,
    parse::{self, Action, Condition, Value},
};

impl parse::Ast {
    /// Genera IR. Contadores de temporales y etiquetas parten de cero en cada llamada.
    pub fn lower(&self) -> Program {
        let mut generator = Generator::default();
        for condition in self.iter() {
            generator.condition(condition);
        }

        log::debug!("generated {} IR instructions", generator.code.len());
        Program::new(generator.code)
    }
}

#[derive(Default)]
struct Generator {
    temps: u32,
    labels: u32,
    open_chain: Vec<Label>,
    code: Vec<Instruction>,
}

impl Generator {
    fn condition(&mut self, condition: &Condition) {
        let var = condition.var().as_ref();

        match condition {
            Condition::Simple { actions, .. } => {
                let end = self.label();
                self.test(var, condition.op(), condition.value(), end);

                self.open_chain.push(end);
                self.actions(actions);
                self.open_chain.pop();

                self.code.push(Instruction::SetLabel(end));
            }

            Condition::Chained { actions, .. } => {
                let end = self.open_chain.last().copied().unwrap_or_else(|| self.label());

                self.test(var, CompareOp::Greater, condition.value(), end);
                self.actions(actions);
            }
        }
    }

    fn test(&mut self, var: &Identifier, op: CompareOp, value: Value, target: Label) {
        let rhs = match value {
            Value::Text(text) => Operand::Text(text),
            Value::Number(number) => Operand::Int(number),
        };

        let cond = self.temp();
        self.code.push(Instruction::CompareAssign {
            dest: cond,
            lhs: Operand::Var(var.clone()),
            op,
            rhs,
        });

        self.code.push(Instruction::JumpIfFalse(cond, target));
    }

    fn actions(&mut self, actions: &[Action]) {
        for action in actions {
            // Las advertencias no generan código
            if let Action::Display(verified) = action {
                let buffer = self.temp();
                self.code.push(Instruction::AllocBuffer(buffer, BUFFER_SIZE));
                self.code.push(Instruction::StoreString(buffer, verified.as_ref().to_string()));
                self.code.push(Instruction::SyscallDisplay(buffer));
            }
        }
    }

    fn temp(&mut self) -> Temp {
        self.temps += 1;
        Temp(self.temps)
    }

    fn label(&mut self) -> Label {
        self.labels += 1;
        Label(self.labels)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::{lex, parse::parse, proverbs::ProverbDatabase, source::Source};

    fn lower(text: &str) -> String {
        let database: ProverbDatabase = [("THEME", "X"), ("AUTRE", "Y")].into_iter().collect();
        let source = Source::new("<test>", text);
        let tokens = lex::tokenize(&source).unwrap();

        parse(tokens.iter(), source.start(), &database)
            .unwrap()
            .ast
            .lower()
            .to_string()
    }

    #[test]
    fn single_numeric_condition() {
        assert_eq!(
            lower("si age > 18: afficher PROVERBE(\"X\")"),
            "t1 = age > 18\n\
             ifFalse t1 goto L1\n\
             t2 = allocate_buffer(256)\n\
             store_string t2, \"THEME: X\"\n\
             syscall display, t2\n\
             label L1\n"
        );
    }

    #[test]
    fn string_condition_with_several_proverbs() {
        assert_eq!(
            lower("si humeur == \"triste\": afficher PROVERBE(\"X\") et PROVERBE(\"Z\")"),
            "t1 = humeur == \"triste\"\n\
             ifFalse t1 goto L1\n\
             t2 = allocate_buffer(256)\n\
             store_string t2, \"THEME: X\"\n\
             syscall display, t2\n\
             t3 = allocate_buffer(256)\n\
             store_string t3, \"PROVERBE INCONNU: Z\"\n\
             syscall display, t3\n\
             label L1\n"
        );
    }

    #[test]
    fn chained_condition_never_closes_its_label() {
        assert_eq!(
            lower(
                "si age > 18: afficher PROVERBE(\"X\")\n\
                 sinon si age > 60: afficher PROVERBE(\"Y\")\n\
                 si richesse > 5: afficher PROVERBE(\"X\")"
            ),
            "t1 = age > 18\n\
             ifFalse t1 goto L1\n\
             t2 = allocate_buffer(256)\n\
             store_string t2, \"THEME: X\"\n\
             syscall display, t2\n\
             label L1\n\
             t3 = age > 60\n\
             ifFalse t3 goto L2\n\
             t4 = allocate_buffer(256)\n\
             store_string t4, \"AUTRE: Y\"\n\
             syscall display, t4\n\
             t5 = richesse > 5\n\
             ifFalse t5 goto L3\n\
             t6 = allocate_buffer(256)\n\
             store_string t6, \"THEME: X\"\n\
             syscall display, t6\n\
             label L3\n"
        );
    }

    #[test]
    fn partial_warning_produces_no_code() {
        let database: ProverbDatabase = [("THEME", "XYZ")].into_iter().collect();
        let source = Source::new("<test>", "si age > 1: afficher PROVERBE(\"Y\")");
        let tokens = lex::tokenize(&source).unwrap();
        let program = parse(tokens.iter(), source.start(), &database).unwrap().ast.lower();

        assert_eq!(program.len(), 6);
        assert_eq!(
            program.instructions()[3].to_string(),
            "store_string t2, \"ATTENTION: Partiel - THEME: XYZ\""
        );
    }
}
