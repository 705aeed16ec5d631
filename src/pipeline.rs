//! Orquestación de las fases del compilador.
//!
//! [`compile()`] construye estado nuevo para cada fase en cada llamada;
//! lo único que se comparte entre compilaciones son el diccionario de
//! proverbios y la tabla de temas esperados, ambos de solo lectura.

use bitflags::bitflags;
use std::{
    fmt::{self, Display},
    rc::Rc,
    str::FromStr,
};

use crate::{
    error::Diagnostics,
    ir::Program,
    lex::{self, Token},
    parse::{self, Action, Ast},
    proverbs::ProverbDatabase,
    semantic::{Analysis, SemanticWarning, SymbolTable},
    source::{Located, Source},
    target::{self, TargetProgram},
    themes::ThemeExpectations,
};

bitflags! {
    /// Artefactos que se desea mostrar tras una compilación.
    pub struct Stages: u32 {
        const TOKENS    = 0x01;
        const AST       = 0x02;
        const SYMBOLS   = 0x04;
        const SEMANTIC  = 0x08;
        const IR        = 0x10;
        const OPTIMIZED = 0x20;
        const ASM       = 0x40;

        const DEFAULT = Self::SEMANTIC.bits | Self::ASM.bits;
    }
}

impl FromStr for Stages {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let stage = match name {
            "tokens" => Stages::TOKENS,
            "ast" => Stages::AST,
            "symbols" => Stages::SYMBOLS,
            "semantic" => Stages::SEMANTIC,
            "ir" => Stages::IR,
            "optimized" => Stages::OPTIMIZED,
            "asm" => Stages::ASM,
            "all" => Stages::all(),
            _ => return Err(format!("unknown stage `{}`", name)),
        };

        Ok(stage)
    }
}

/// Todo lo que produce una compilación cuyo front end tuvo éxito.
#[derive(Debug)]
pub struct Compilation {
    pub source: Rc<Source>,
    pub tokens: Vec<Located<Token>>,
    pub ast: Ast,

    /// Tabla construida por el parser.
    pub symbols: SymbolTable,

    pub analysis: Analysis,
    pub ir: Program,
    pub optimized: Program,
    pub target: TargetProgram,
}

/// Compila un conjunto de reglas.
///
/// Errores léxicos y sintácticos son fatales y se retornan como `Err`.
/// Los hallazgos semánticos nunca impiden generar código; se consultan
/// en [`Compilation::analysis`].
pub fn compile(
    source: &Rc<Source>,
    database: &ProverbDatabase,
    expectations: &ThemeExpectations,
) -> Result<Compilation, Diagnostics> {
    let tokens = lex::tokenize(source).map_err(|error| Diagnostics::from(error).kind("Lexical error"))?;

    let parse::Parsed { ast, symbols } = parse::parse(tokens.iter(), source.start(), database)
        .map_err(|error| Diagnostics::from(error).kind("Syntax error"))?;

    let analysis = ast.analyze(database, expectations);
    let ir = ast.lower();
    let optimized = ir.optimize();
    let target = target::emit(&optimized);

    log::info!(
        "{}: {} conditions, {} semantic errors, {} IR instructions",
        source.name(),
        ast.conditions().len(),
        analysis.errors.len(),
        optimized.len()
    );

    Ok(Compilation {
        source: Rc::clone(source),
        tokens,
        ast,
        symbols,
        analysis,
        ir,
        optimized,
        target,
    })
}

impl Compilation {
    /// Errores y advertencias, en ese orden.
    ///
    /// Las advertencias incluyen las del análisis semántico seguidas de
    /// los proverbios parciales que el parser dejó en el AST.
    pub fn diagnostics(&self) -> (Diagnostics, Diagnostics) {
        let errors = Diagnostics::from(self.analysis.errors.as_slice()).kind("Semantic error");

        let mut warnings = self.analysis.warnings.clone();
        warnings.extend(self.partial_proverbs());
        let warnings = Diagnostics::from(warnings).warnings();

        (errors, warnings)
    }

    /// Una advertencia por cada proverbio que solo coincidió parcialmente.
    pub fn partial_proverbs(&self) -> impl Iterator<Item = Located<SemanticWarning>> + '_ {
        self.ast
            .iter()
            .flat_map(|condition| condition.actions())
            .filter_map(|action| match action {
                Action::Warning(warning) => {
                    Some(Located::at(SemanticWarning::PartialProverb, warning.location().clone()))
                }

                Action::Display(_) => None,
            })
    }

    pub fn token_listing(&self) -> TokenListing<'_> {
        TokenListing(&self.tokens)
    }

    pub fn used_proverbs<'a>(&'a self, database: &'a ProverbDatabase) -> UsedProverbs<'a> {
        UsedProverbs {
            analysis: &self.analysis,
            database,
        }
    }
}

/// Un token por línea: `KIND valor (ligne n)`.
pub struct TokenListing<'a>(&'a [Located<Token>]);

impl Display for TokenListing<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in self.0 {
            let line = token.location().line();
            let token = token.as_ref();
            writeln!(fmt, "{} {} (ligne {})", token.kind(), token.value(), line)?;
        }

        Ok(())
    }
}

/// Temas usados y su texto, en orden alfabético.
pub struct UsedProverbs<'a> {
    analysis: &'a Analysis,
    database: &'a ProverbDatabase,
}

impl Display for UsedProverbs<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for theme in &self.analysis.used_themes {
            let text = self.database.get(theme).unwrap_or_default();
            writeln!(fmt, "{}: {}", theme, text)?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn compile_text(text: &str) -> Result<Compilation, Diagnostics> {
        let source = Source::new("<test>", text);
        compile(&source, &ProverbDatabase::defaults(), &ThemeExpectations::defaults())
    }

    #[test]
    fn stage_names() {
        assert_eq!("ir".parse::<Stages>(), Ok(Stages::IR));
        assert_eq!("all".parse::<Stages>(), Ok(Stages::all()));
        assert!("binario".parse::<Stages>().is_err());
        assert!(Stages::DEFAULT.contains(Stages::SEMANTIC | Stages::ASM));
        assert!(!Stages::DEFAULT.contains(Stages::TOKENS));
    }

    #[test]
    fn token_listing() {
        let compilation = compile_text("si age > 18:\n  afficher PROVERBE(\"الصبر مفتاح الفرج\")").unwrap();

        assert_eq!(
            compilation.token_listing().to_string(),
            "SI si (ligne 1)\n\
             NOM age (ligne 1)\n\
             SUPERIEUR > (ligne 1)\n\
             NOMBRE 18 (ligne 1)\n\
             DPOINTS : (ligne 1)\n\
             AFFICHER afficher (ligne 2)\n\
             PROVERBE الصبر مفتاح الفرج (ligne 2)\n"
        );
    }

    #[test]
    fn used_proverbs_listing() {
        let database = ProverbDatabase::defaults();
        let compilation = compile_text(
            "si humeur == \"triste\": afficher PROVERBE(\"الصبر مفتاح الفرج\") \
             et PROVERBE(\"أسمع كلام اللي يبكيك وماتسمعش كلام اللي يضحكك\")",
        )
        .unwrap();

        assert_eq!(
            compilation.used_proverbs(&database).to_string(),
            "CONSEIL: أسمع كلام اللي يبكيك وماتسمعش كلام اللي يضحكك\n\
             PATIENCE: الصبر مفتاح الفرج\n"
        );
    }

    #[test]
    fn partial_proverbs_are_reported_by_the_driver() {
        let compilation = compile_text(
            "si humeur == \"triste\": afficher PROVERBE(\"مفتاح الفرج\")\n\
             si meteo == \"pluie\": afficher PROVERBE(\"الصبر مفتاح الفرج\")",
        )
        .unwrap();

        assert_eq!(compilation.analysis.warnings.len(), 1);
        assert_eq!(compilation.partial_proverbs().count(), 1);

        let (errors, warnings) = compilation.diagnostics();
        assert!(errors.is_empty());
        assert_eq!(
            warnings.messages().collect::<Vec<_>>(),
            [
                "Aucun thème attendu défini pour la variable 'meteo'",
                "Le proverbe saisi est partiel",
            ]
        );
    }

    #[test]
    fn fatal_errors_are_labeled() {
        let lexical = compile_text("si age@").unwrap_err();
        assert!(lexical.to_string().starts_with("Lexical error: Erreur lexicale: '@' (ligne 1)"));

        let syntax = compile_text("si age 18").unwrap_err();
        assert!(syntax.to_string().starts_with("Syntax error: Erreur syntaxique ligne 1: '18'"));
    }
}
