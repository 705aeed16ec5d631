//! Compilador de reglas condición → proverbio.
//!
//! # Front end
//! Cada compilación parte de un único conjunto de reglas. El texto se
//! somete primero a análisis léxico en [`lex`], de lo cual se obtiene un
//! flujo de tokens. El flujo de tokens se dispone en un AST por medio de
//! análisis sintáctico en [`parse`], fase en la que además se verifica
//! cada proverbio citado contra el diccionario de [`proverbs`]. El árbol
//! es recorrido por el análisis semántico en [`semantic`], que revisa
//! tipos y la coherencia temática descrita en [`themes`].
//!
//! # Back end
//! Independientemente del análisis semántico, el AST se traduce a código
//! de tres direcciones descrito en [`ir`], se somete a una pasada de
//! optimización de mirilla y finalmente se emite como pseudo-ensamblador
//! x86 en [`target`].
//!
//! [`pipeline`] encadena todas las fases y [`error`] presenta los
//! diagnósticos resultantes.

#[macro_use]
mod macros;

pub mod error;
pub mod ir;
pub mod lex;
pub mod parse;
pub mod pipeline;
pub mod proverbs;
pub mod semantic;
pub mod source;
pub mod themes;

mod codegen;

/// Emisión de código.
///
/// Este módulo reexporta suficientes ítems internos relacionados a generación de código para
/// traducir IR a pseudo-ensamblador.
pub mod target {
    pub use crate::codegen::frame::{Frame, StringLabel, StringTable};
    pub use crate::codegen::{emit, emit_listing, TargetProgram};
}
