//! Optimización de mirilla.
//!
//! Una sola pasada hacia adelante con una única regla: un `goto T` que
//! sigue inmediatamente a un `ifFalse X goto T` conservado se elimina.
//! Toda otra instrucción pasa intacta.
//!
//! La comparación se hace contra la última instrucción conservada y no
//! contra la anterior en la entrada. Así `ifFalse t1 goto L1; goto L1;
//! goto L1` pierde ambos saltos en una pasada, y una segunda pasada no
//! cambia nada.

use super::{Instruction, Program};

impl Program {
    pub fn optimize(&self) -> Program {
        let mut kept: Vec<Instruction> = Vec::with_capacity(self.len());

        for instruction in self.iter() {
            if let (Some(Instruction::JumpIfFalse(_, target)), Instruction::Jump(jump)) =
                (kept.last(), instruction)
            {
                if target == jump {
                    continue;
                }
            }

            kept.push(instruction.clone());
        }

        log::debug!("peephole: {} -> {} instructions", self.len(), kept.len());
        Program::new(kept)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn optimize(text: &str) -> String {
        text.parse::<Program>().unwrap().optimize().to_string()
    }

    #[test]
    fn drops_redundant_jump() {
        assert_eq!(
            optimize("t1 = age > 18\nifFalse t1 goto L1\ngoto L1\nlabel L1\n"),
            "t1 = age > 18\nifFalse t1 goto L1\nlabel L1\n"
        );
    }

    #[test]
    fn keeps_jump_to_other_label() {
        let text = "ifFalse t1 goto L1\ngoto L2\nlabel L1\n";
        assert_eq!(optimize(text), text);
    }

    #[test]
    fn keeps_non_adjacent_jump() {
        let text = "ifFalse t1 goto L1\nsyscall display, t2\ngoto L1\n";
        assert_eq!(optimize(text), text);
    }

    #[test]
    fn chain_of_jumps_collapses_in_one_pass() {
        let program: Program = "ifFalse t1 goto L1\ngoto L1\ngoto L1\nlabel L1".parse().unwrap();

        let once = program.optimize();
        assert_eq!(once.to_string(), "ifFalse t1 goto L1\nlabel L1\n");
        assert_eq!(once.optimize(), once);
    }

    #[test]
    fn idempotent_on_generated_shapes() {
        let program: Program = "t1 = humeur == \"triste\"\n\
                                ifFalse t1 goto L1\n\
                                goto L1\n\
                                t2 = allocate_buffer(256)\n\
                                goto L3\n\
                                ifFalse t2 goto L3\n\
                                goto L3\n\
                                label L1"
            .parse()
            .unwrap();

        let once = program.optimize();
        assert_eq!(once.len(), 6);
        assert_eq!(once.optimize(), once);
    }
}
