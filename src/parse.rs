//! Análisis sintáctico.
//!
//! # Gramática
//! ```text
//! conseil   := condition+
//! condition := SI NOM EGAL STRING DPOINTS actions
//!            | SI NOM SUPERIEUR NOMBRE DPOINTS actions
//!            | SINON SI NOM SUPERIEUR NOMBRE DPOINTS actions
//! actions   := AFFICHER PROVERBE (ET PROVERBE)*
//! ```
//!
//! No existe forma `sinon si` para comparaciones de cadenas.
//!
//! # Validación de proverbios
//! Cada `PROVERBE("...")` se busca en el diccionario en el momento en que
//! se reconoce, y la acción resultante ya lleva la etiqueta de resolución.
//! Una coincidencia parcial agrega además una advertencia inmediatamente
//! después de la acción. Un proverbio desconocido no es un error sintáctico;
//! queda marcado para que lo reporte el análisis semántico.
//!
//! # Errores
//! El parser se detiene en el primer token que no calza con la gramática.

use std::{
    fmt::{self, Display},
    iter::Peekable,
};
use thiserror::Error;

use crate::{
    ir::CompareOp,
    lex::{Identifier, Keyword, Token},
    proverbs::{ProverbDatabase, Verified},
    semantic::{SymbolTable, Type},
    source::{Located, Location},
};

/// Mensaje de la advertencia que acompaña a un proverbio parcial.
pub const PARTIAL_WARNING: &str = "Le proverbe saisi est partiel";

#[derive(Debug, Clone, PartialEq)]
pub struct Ast(Vec<Condition>);

impl Ast {
    pub fn conditions(&self) -> &[Condition] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Condition> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `si var == "texto":` o `si var > n:`
    Simple {
        var: Located<Identifier>,
        test: Test,
        actions: Vec<Action>,
    },

    /// `sinon si var > n:`
    Chained {
        var: Located<Identifier>,
        value: Located<i64>,
        actions: Vec<Action>,
    },
}

impl Condition {
    pub fn var(&self) -> &Located<Identifier> {
        match self {
            Condition::Simple { var, .. } | Condition::Chained { var, .. } => var,
        }
    }

    pub fn op(&self) -> CompareOp {
        match self {
            Condition::Simple { test, .. } => test.op(),
            Condition::Chained { .. } => CompareOp::Greater,
        }
    }

    pub fn value(&self) -> Value {
        match self {
            Condition::Simple { test, .. } => test.value(),
            Condition::Chained { value, .. } => Value::Number(*value.val()),
        }
    }

    pub fn actions(&self) -> &[Action] {
        match self {
            Condition::Simple { actions, .. } | Condition::Chained { actions, .. } => actions,
        }
    }

    pub fn is_chained(&self) -> bool {
        matches!(self, Condition::Chained { .. })
    }
}

/// Comparación de una condición simple. El operador determina el tipo del literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    Equal(Located<String>),
    Greater(Located<i64>),
}

impl Test {
    pub fn op(&self) -> CompareOp {
        match self {
            Test::Equal(_) => CompareOp::Equal,
            Test::Greater(_) => CompareOp::Greater,
        }
    }

    pub fn value(&self) -> Value {
        match self {
            Test::Equal(text) => Value::Text(text.val().clone()),
            Test::Greater(number) => Value::Number(*number.val()),
        }
    }
}

/// Lado derecho de una comparación.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Number(i64),
}

impl Value {
    /// Tipo que implica este literal.
    pub fn typ(&self) -> Type {
        match self {
            Value::Text(_) => Type::String,
            Value::Number(_) => Type::Number,
        }
    }
}

impl Display for Value {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => fmt.write_str(text),
            Value::Number(number) => write!(fmt, "{}", number),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// `afficher`/`et` con el proverbio ya verificado.
    Display(Located<Verified>),

    /// Advertencia insertada por el parser.
    Warning(Located<String>),
}

/// Resultado del análisis sintáctico.
#[derive(Debug)]
pub struct Parsed {
    pub ast: Ast,

    /// Tipos fijados por la primera aparición de cada variable.
    pub symbols: SymbolTable,
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParserError {
    #[error("Erreur syntaxique ligne {}: '{}'", .line, .found.value())]
    UnexpectedToken { line: u32, found: Token },

    #[error("Erreur: Fin de fichier inattendue")]
    UnexpectedEof,
}

pub fn parse<'a, I>(
    tokens: I,
    start: Location,
    database: &ProverbDatabase,
) -> Result<Parsed, Located<ParserError>>
where
    I: IntoIterator<Item = &'a Located<Token>>,
{
    let mut parser = Parser {
        tokens: tokens.into_iter().peekable(),
        last_known: start,
        database,
        symbols: SymbolTable::default(),
    };

    let ast = parser.program()?;
    log::debug!("parsed {} conditions", ast.conditions().len());

    Ok(Parsed {
        ast,
        symbols: parser.symbols,
    })
}

struct Parser<'db, I: Iterator> {
    tokens: Peekable<I>,
    last_known: Location,
    database: &'db ProverbDatabase,
    symbols: SymbolTable,
}

type Parse<T> = Result<T, Located<ParserError>>;

impl<'a, I: Iterator<Item = &'a Located<Token>>> Parser<'_, I> {
    fn program(&mut self) -> Parse<Ast> {
        // Al menos una condición
        let mut conditions = vec![self.condition()?];
        while self.tokens.peek().is_some() {
            conditions.push(self.condition()?);
        }

        Ok(Ast(conditions))
    }

    fn condition(&mut self) -> Parse<Condition> {
        let (location, token) = self.next()?.split();
        let condition = match token {
            Token::Keyword(Keyword::Si) => self.simple_condition()?,
            Token::Keyword(Keyword::Sinon) => self.chained_condition()?,
            found => return self.unexpected(found, &location),
        };

        self.symbols
            .declare(condition.var().as_ref(), Type::implied_by(condition.op()));

        Ok(condition)
    }

    fn simple_condition(&mut self) -> Parse<Condition> {
        let var = self.id()?;

        let (location, token) = self.next()?.split();
        let test = match token {
            Token::Equal => Test::Equal(self.string()?),
            Token::Greater => Test::Greater(self.integer()?),
            found => return self.unexpected(found, &location),
        };

        self.expect(Token::Colon)?;
        let actions = self.actions()?;

        Ok(Condition::Simple { var, test, actions })
    }

    fn chained_condition(&mut self) -> Parse<Condition> {
        self.keyword(Keyword::Si)?;
        let var = self.id()?;

        self.expect(Token::Greater)?;
        let value = self.integer()?;

        self.expect(Token::Colon)?;
        let actions = self.actions()?;

        Ok(Condition::Chained {
            var,
            value,
            actions,
        })
    }

    fn actions(&mut self) -> Parse<Vec<Action>> {
        self.keyword(Keyword::Afficher)?;

        let mut actions = Vec::new();
        self.display(&mut actions)?;

        while let Some(Token::Keyword(Keyword::Et)) = self.tokens.peek().map(|token| token.val()) {
            self.next()?;
            self.display(&mut actions)?;
        }

        Ok(actions)
    }

    fn display(&mut self, actions: &mut Vec<Action>) -> Parse<()> {
        let (location, text) = self.proverb()?.split();

        let verified = self.database.verify(&text);
        let partial = verified.is_partial();

        actions.push(Action::Display(Located::at(verified, location.clone())));
        if partial {
            let warning = String::from(PARTIAL_WARNING);
            actions.push(Action::Warning(Located::at(warning, location)));
        }

        Ok(())
    }

    fn proverb(&mut self) -> Parse<Located<String>> {
        let (location, token) = self.next()?.split();
        match token {
            Token::Proverb(text) => Ok(Located::at(text, location)),
            found => self.unexpected(found, &location),
        }
    }

    fn string(&mut self) -> Parse<Located<String>> {
        let (location, token) = self.next()?.split();
        match token {
            Token::StrLiteral(text) => Ok(Located::at(text, location)),
            found => self.unexpected(found, &location),
        }
    }

    fn integer(&mut self) -> Parse<Located<i64>> {
        let (location, token) = self.next()?.split();
        match token {
            Token::IntLiteral(integer) => Ok(Located::at(integer, location)),
            found => self.unexpected(found, &location),
        }
    }

    fn id(&mut self) -> Parse<Located<Identifier>> {
        let (location, token) = self.next()?.split();
        match token {
            Token::Id(id) => Ok(Located::at(id, location)),
            found => self.unexpected(found, &location),
        }
    }

    fn keyword(&mut self, keyword: Keyword) -> Parse<()> {
        self.expect(Token::Keyword(keyword))
    }

    fn expect(&mut self, token: Token) -> Parse<()> {
        let (location, found) = self.next()?.split();
        if found == token {
            Ok(())
        } else {
            self.unexpected(found, &location)
        }
    }

    fn next(&mut self) -> Parse<Located<Token>> {
        match self.tokens.next() {
            Some(token) => {
                self.last_known = token.location().clone();
                Ok(token.clone())
            }

            None => Err(Located::at(
                ParserError::UnexpectedEof,
                self.last_known.clone(),
            )),
        }
    }

    fn unexpected<T>(&self, found: Token, location: &Location) -> Parse<T> {
        let error = ParserError::UnexpectedToken {
            line: location.line(),
            found,
        };

        Err(Located::at(error, location.clone()))
    }
}
