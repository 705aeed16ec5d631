//! Análisis semántico.
//!
//! Esta fase recorre de nuevo el AST con una tabla de símbolos propia,
//! independiente de la que construye el parser. Ningún hallazgo detiene
//! el análisis: errores y advertencias se acumulan en orden de aparición
//! y se entregan completos en un [`Analysis`].
//!
//! # Reglas
//! - La primera aparición de una variable fija su tipo. Si la tabla de
//!   temas esperados conoce a la variable, su tipo es el que declara el
//!   grupo de reglas; de lo contrario es el que implica el operador.
//!   Toda aparición cuyo operador implique otro tipo es un error.
//! - Un proverbio desconocido es un error.
//! - Un proverbio cuyo tema existe en el diccionario se registra como
//!   usado y debe pertenecer a los temas esperados para la condición.
//!   Si no hay temas esperados se advierte y la verificación se da por
//!   buena.
//! - Un proverbio parcial no se verifica. Su advertencia permanece en el
//!   AST y no forma parte de [`Analysis::warnings`].

use indexmap::IndexMap;
use thiserror::Error;

use std::{
    collections::BTreeSet,
    fmt::{self, Display},
};

use crate::{
    ir::CompareOp,
    lex::Identifier,
    parse::{self, Action, Condition, Value},
    proverbs::{ProverbDatabase, Verified},
    source::Located,
    themes::{RuleGroup, ThemeExpectations},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    String,
    Number,
}

impl Type {
    /// Tipo que el operador de una comparación exige a su variable.
    pub fn implied_by(op: CompareOp) -> Type {
        match op {
            CompareOp::Equal => Type::String,
            CompareOp::Greater | CompareOp::Less => Type::Number,
        }
    }
}

impl Display for Type {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::String => fmt.write_str("string"),
            Type::Number => fmt.write_str("number"),
        }
    }
}

/// Variables y sus tipos, en orden de primera aparición.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: IndexMap<Identifier, Type>,
}

impl SymbolTable {
    /// Registra una variable si aún no existe y retorna el tipo que quedó fijado.
    pub fn declare(&mut self, id: &Identifier, typ: Type) -> Type {
        *self.symbols.entry(id.clone()).or_insert(typ)
    }

    pub fn get(&self, name: &str) -> Option<Type> {
        self.symbols.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, Type)> {
        self.symbols.iter().map(|(id, &typ)| (id, typ))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Display for SymbolTable {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, typ) in self.iter() {
            writeln!(fmt, "{}: {}", id, typ)?;
        }

        Ok(())
    }
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemanticError {
    #[error("Type incompatible pour {var} (attendu: {expected})")]
    TypeMismatch { var: Identifier, expected: Type },

    #[error("Proverbe inconnu: {}{}", Verified::UNKNOWN_TAG, .0)]
    UnknownProverb(String),

    #[error(
        "Incohérence sémantique: le proverbe '{theme}' ({text}) ne correspond pas à la condition '{var} {op} {value}'. Thèmes attendus: {}",
        .expected.join(", ")
    )]
    ThemeMismatch {
        theme: String,
        text: String,
        var: Identifier,
        op: CompareOp,
        value: Value,
        expected: Vec<String>,
    },
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticWarning {
    #[error("Aucun thème attendu défini pour la variable '{0}'")]
    NoExpectedTheme(Identifier),

    /// No la emite el análisis; se deriva de las acciones de advertencia del AST.
    #[error("Le proverbe saisi est partiel")]
    PartialProverb,
}

/// Resultado completo del análisis semántico.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub symbols: SymbolTable,
    pub errors: Vec<Located<SemanticError>>,
    pub warnings: Vec<Located<SemanticWarning>>,

    /// Temas del diccionario que aparecen en al menos un `afficher`.
    pub used_themes: BTreeSet<String>,
}

impl Analysis {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl parse::Ast {
    /// Analiza el árbol completo. Cada llamada parte de un estado vacío.
    pub fn analyze(
        &self,
        database: &ProverbDatabase,
        expectations: &ThemeExpectations,
    ) -> Analysis {
        let mut analyzer = Analyzer {
            database,
            expectations,
            analysis: Analysis::default(),
        };

        for condition in self.iter() {
            analyzer.condition(condition);
        }

        let analysis = analyzer.analysis;
        log::debug!(
            "semantic analysis: {} errors, {} warnings, {} themes used",
            analysis.errors.len(),
            analysis.warnings.len(),
            analysis.used_themes.len()
        );

        analysis
    }
}

struct Analyzer<'a> {
    database: &'a ProverbDatabase,
    expectations: &'a ThemeExpectations,
    analysis: Analysis,
}

impl Analyzer<'_> {
    fn condition(&mut self, condition: &Condition) {
        let var = condition.var();
        let op = condition.op();
        let implied = Type::implied_by(op);

        let declared = self
            .expectations
            .group(var.as_ref().as_ref())
            .map_or(implied, RuleGroup::declared_type);

        let recorded = self.analysis.symbols.declare(var.as_ref(), declared);
        if recorded != implied {
            let error = SemanticError::TypeMismatch {
                var: var.as_ref().clone(),
                expected: recorded,
            };

            self.analysis.errors.push(Located::at(error, var.location().clone()));
        }

        let value = condition.value();
        // Las advertencias de proverbio parcial quedan en el AST
        for action in condition.actions() {
            if let Action::Display(verified) = action {
                self.display(var, op, &value, verified);
            }
        }
    }

    fn display(
        &mut self,
        var: &Located<Identifier>,
        op: CompareOp,
        value: &Value,
        verified: &Located<Verified>,
    ) {
        let location = verified.location();

        if let Verified::Unknown(text) = verified.as_ref() {
            let error = SemanticError::UnknownProverb(text.clone());
            self.analysis.errors.push(Located::at(error, location.clone()));
            return;
        }

        // Una etiqueta de resolución que no es tema del diccionario se omite
        let theme = verified.as_ref().theme_token();
        let text = match self.database.get(theme) {
            Some(text) => text,
            None => return,
        };

        self.analysis.used_themes.insert(theme.to_owned());

        let expected = self
            .expectations
            .expected_themes(var.as_ref().as_ref(), Some(value));

        if expected.is_empty() {
            let warning = SemanticWarning::NoExpectedTheme(var.as_ref().clone());
            self.analysis.warnings.push(Located::at(warning, var.location().clone()));
        } else if !expected.contains(theme) {
            let error = SemanticError::ThemeMismatch {
                theme: theme.to_owned(),
                text: text.to_owned(),
                var: var.as_ref().clone(),
                op,
                value: value.clone(),
                expected: expected.into_iter().collect(),
            };

            self.analysis.errors.push(Located::at(error, location.clone()));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{lex, parse::parse, source::Source};

    fn analyze(text: &str) -> Analysis {
        let database = ProverbDatabase::defaults();
        let source = Source::new("<test>", text);
        let tokens = lex::tokenize(&source).unwrap();
        let parsed = parse(tokens.iter(), source.start(), &database).unwrap();

        parsed.ast.analyze(&database, &ThemeExpectations::defaults())
    }

    fn errors(analysis: &Analysis) -> Vec<SemanticError> {
        analysis.errors.iter().map(|error| error.as_ref().clone()).collect()
    }

    #[test]
    fn coherent_categorical_rule() {
        let analysis = analyze(
            "si humeur == \"triste\":\n    afficher PROVERBE(\"أسمع كلام اللي يبكيك وماتسمعش كلام اللي يضحكك\")",
        );

        assert!(analysis.errors.is_empty());
        assert!(analysis.warnings.is_empty());
        assert_eq!(analysis.symbols.get("humeur"), Some(Type::String));
        assert_eq!(analysis.symbols.len(), 1);
        assert_eq!(analysis.used_themes.iter().collect::<Vec<_>>(), ["CONSEIL"]);
    }

    #[test]
    fn coherent_numeric_rule() {
        let analysis = analyze("si age > 60: afficher PROVERBE(\"إسأل مجرب ولا تسأل طبيب\")");

        assert!(analysis.is_ok());
        assert_eq!(analysis.symbols.get("age"), Some(Type::Number));
    }

    #[test]
    fn theme_mismatch() {
        let analysis = analyze("si humeur == \"triste\": afficher PROVERBE(\"اللي عندو ما يموتش\")");

        assert_eq!(
            errors(&analysis),
            [SemanticError::ThemeMismatch {
                theme: String::from("RICHESSE"),
                text: String::from("اللي عندو ما يموتش"),
                var: Identifier::new("humeur"),
                op: CompareOp::Equal,
                value: Value::Text(String::from("triste")),
                expected: vec![
                    String::from("CONSEIL"),
                    String::from("PATIENCE"),
                    String::from("SOLIDARITE"),
                ],
            }]
        );

        assert_eq!(
            analysis.errors[0].as_ref().to_string(),
            "Incohérence sémantique: le proverbe 'RICHESSE' (اللي عندو ما يموتش) ne correspond \
             pas à la condition 'humeur == triste'. Thèmes attendus: CONSEIL, PATIENCE, SOLIDARITE"
        );

        // El tema sigue contando como usado
        assert!(analysis.used_themes.contains("RICHESSE"));
    }

    #[test]
    fn string_against_numeric_variable() {
        let analysis = analyze("si age == \"soixante\": afficher PROVERBE(\"الكبير كبير ولو طار\")");

        assert_eq!(
            errors(&analysis),
            [SemanticError::TypeMismatch {
                var: Identifier::new("age"),
                expected: Type::Number,
            }]
        );

        assert_eq!(
            analysis.errors[0].as_ref().to_string(),
            "Type incompatible pour age (attendu: number)"
        );
    }

    #[test]
    fn later_conflicting_operator() {
        let analysis = analyze(
            "si meteo > 3: afficher PROVERBE(\"الصبر مفتاح الفرج\")\n\
             si meteo == \"pluie\": afficher PROVERBE(\"الصبر مفتاح الفرج\")",
        );

        let type_errors = analysis
            .errors
            .iter()
            .filter(|error| matches!(error.as_ref(), SemanticError::TypeMismatch { .. }))
            .count();

        assert_eq!(type_errors, 1);
        assert_eq!(analysis.symbols.get("meteo"), Some(Type::Number));
        assert_eq!(analysis.errors[0].location().line(), 2);
    }

    #[test]
    fn unknown_proverb() {
        let analysis = analyze("si age > 18: afficher PROVERBE(\"X\")");

        assert_eq!(errors(&analysis), [SemanticError::UnknownProverb(String::from("X"))]);
        assert_eq!(
            analysis.errors[0].as_ref().to_string(),
            "Proverbe inconnu: PROVERBE INCONNU: X"
        );
        assert!(analysis.used_themes.is_empty());
    }

    #[test]
    fn partial_proverb_is_neither_warned_nor_checked() {
        let analysis = analyze("si humeur == \"triste\": afficher PROVERBE(\"مفتاح الفرج\")");

        assert!(analysis.errors.is_empty());
        assert!(analysis.warnings.is_empty());
        assert!(analysis.used_themes.is_empty());
    }

    #[test]
    fn variable_without_expectations() {
        let analysis = analyze("si meteo == \"pluie\": afficher PROVERBE(\"الصبر مفتاح الفرج\")");

        assert!(analysis.errors.is_empty());
        assert_eq!(analysis.warnings.len(), 1);
        assert_eq!(
            analysis.warnings[0].as_ref().to_string(),
            "Aucun thème attendu défini pour la variable 'meteo'"
        );
        assert!(analysis.used_themes.contains("PATIENCE"));
    }

    #[test]
    fn chained_condition_uses_its_own_value() {
        let analysis = analyze(
            "si age > 25: afficher PROVERBE(\"اللي يغامر يربح\")\n\
             sinon si age > 65: afficher PROVERBE(\"الكبير كبير ولو طار\")",
        );

        assert!(analysis.is_ok(), "{:?}", analysis.errors);
        assert_eq!(
            analysis.used_themes.iter().collect::<Vec<_>>(),
            ["AGE", "OPPORTUNITE"]
        );
    }

    #[test]
    fn fresh_state_per_run() {
        let database = ProverbDatabase::defaults();
        let expectations = ThemeExpectations::defaults();

        let source = Source::new("<test>", "si age > 18: afficher PROVERBE(\"X\")");
        let tokens = lex::tokenize(&source).unwrap();
        let parsed = parse(tokens.iter(), source.start(), &database).unwrap();

        let first = parsed.ast.analyze(&database, &expectations);
        let second = parsed.ast.analyze(&database, &expectations);
        assert_eq!(first.errors.len(), 1);
        assert_eq!(second.errors.len(), 1);
    }
}
