//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone el texto de un
//! conjunto de reglas en unidades léxicas denominadas tokens. Los espacios
//! y tabuladores se descartan; los saltos de línea solo hacen avanzar el
//! contador de líneas. Cada token emitido está asociado a una ubicación en
//! el código fuente original.
//!
//! # Contenido de un token
//! Operadores, puntuación y palabras clave se identifican por lo que son y
//! no incluyen lexemas. Los identificadores conservan su lexema original.
//! Las constantes enteras se resuelven a su valor, y tanto las cadenas como
//! los proverbios se entregan sin comillas.
//!
//! # Prioridad
//! En cada posición se intenta primero la forma de llamada
//! `PROVERBE("...")`. Solo si esta no calza se consideran enteros,
//! cadenas, identificadores y operadores, en ese orden.
//!
//! # Reglas importantes del lenguaje
//! - Las palabras clave (`si`, `sinon`, `afficher`, `et`) son
//!   case-insensitive, no así los identificadores.
//! - Los identificadores pueden incluir `'é'`, `'è'` y `'à'`.
//! - Las cadenas no pueden ser vacías.
//!
//! # Errores
//! El lexer no se recupera: el primer carácter desconocido detiene el
//! análisis y no se entrega ningún flujo parcial.

use crate::source::{Located, Location, Position, Source};
use std::{
    fmt::{self, Display},
    rc::Rc,
    str::FromStr,
};

use thiserror::Error;

// Case-insensitive
pub use unicase::Ascii as NoCase;

/// Prefijo de la forma de llamada de un proverbio.
const PROVERB_CALL: &str = "PROVERBE(";

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexerError {
    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Erreur lexicale: '{found}' (ligne {line})")]
    BadChar { found: char, line: u32 },

    /// Una constante entera se encuentra fuera de rango.
    #[error("Erreur lexicale: entier trop grand, le maximum est {} (ligne {})", i64::MAX, .line)]
    IntOverflow { line: u32 },
}

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(Rc<str>);

impl Identifier {
    pub fn new(name: &str) -> Self {
        Identifier(Rc::from(name))
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

/// Objeto resultante del análisis léxico.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identificador (`NOM`).
    Id(Identifier),

    /// Palabra clave.
    Keyword(Keyword),

    /// Literal de entero (`NOMBRE`).
    IntLiteral(i64),

    /// Literal de cadena, sin comillas (`STRING`).
    StrLiteral(String),

    /// Texto de un `PROVERBE("...")` (`PROVERBE`).
    Proverb(String),

    /// `==`
    Equal,

    /// `>`
    Greater,

    /// `:`
    Colon,
}

impl Token {
    /// Nombre de la clase léxica, tal como se lista en salidas de depuración.
    pub fn kind(&self) -> &'static str {
        use Token::*;

        match self {
            Id(_) => "NOM",
            Keyword(self::Keyword::Si) => "SI",
            Keyword(self::Keyword::Sinon) => "SINON",
            Keyword(self::Keyword::Afficher) => "AFFICHER",
            Keyword(self::Keyword::Et) => "ET",
            IntLiteral(_) => "NOMBRE",
            StrLiteral(_) => "STRING",
            Proverb(_) => "PROVERBE",
            Equal => "EGAL",
            Greater => "SUPERIEUR",
            Colon => "DPOINTS",
        }
    }

    /// Valor del token, sin decoración.
    pub fn value(&self) -> String {
        use Token::*;

        match self {
            Id(id) => id.to_string(),
            Keyword(keyword) => keyword.to_string(),
            IntLiteral(integer) => integer.to_string(),
            StrLiteral(text) | Proverb(text) => text.clone(),
            Equal => String::from("=="),
            Greater => String::from(">"),
            Colon => String::from(":"),
        }
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Id(id) => write!(fmt, "identifier `{}`", id),
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            IntLiteral(integer) => write!(fmt, "literal `{}`", integer),
            StrLiteral(text) => write!(fmt, "literal \"{}\"", text),
            Proverb(text) => write!(fmt, "PROVERBE(\"{}\")", text),
            Equal => fmt.write_str("`==`"),
            Greater => fmt.write_str("`>`"),
            Colon => fmt.write_str("`:`"),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Si,
    Sinon,
    Afficher,
    Et,
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Keyword::*;
        let string = match self {
            Si       => "si",
            Sinon    => "sinon",
            Afficher => "afficher",
            Et       => "et",
        };

        fmt.write_str(string)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        use Keyword::*;

        const KEYWORDS: &[(NoCase<&str>, Keyword)] = &[
            (NoCase::new("si"),       Si),
            (NoCase::new("sinon"),    Sinon),
            (NoCase::new("afficher"), Afficher),
            (NoCase::new("et"),       Et),
        ];

        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == NoCase::new(string))
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Reduce un conjunto de reglas a su secuencia de tokens.
///
/// Falla con el primer error léxico encontrado.
pub fn tokenize(source: &Rc<Source>) -> Result<Vec<Located<Token>>, Located<LexerError>> {
    let tokens = Lexer::new(source).collect::<Result<Vec<_>, _>>()?;
    log::debug!("{}: {} tokens", source.name(), tokens.len());

    Ok(tokens)
}

/// Máquina de estados para análisis léxico.
///
/// La salida del lexer, así como su siguiente estado, se define
/// a partir de tanto su estado actual como el siguiente carácter
/// encontrado en la entrada.
pub struct Lexer<'a> {
    source: Rc<Source>,
    cursor: Cursor<'a>,
    state: State,
    start: Position,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado terminal tras un error; no se emiten más tokens.
    Error,

    /// Estado de completitud; siempre emite el token incluido,
    /// consume la entrada actual y pasa a [`State::Start`].
    Complete(Token),

    /// Se encontró `=`, debería seguir otro `=`.
    EqualSign,

    /// Constante entera.
    Integer(i64),

    /// Término que puede ser un identificador o una palabra clave.
    Word(String),

    /// Interior de una cadena entre comillas.
    Text(String),
}

/// Posición de lectura sobre el texto restante.
#[derive(Copy, Clone)]
struct Cursor<'a> {
    rest: &'a str,
    here: Position,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let mut chars = self.rest.chars();
        let c = chars.next()?;
        self.rest = chars.as_str();

        self.here = match c {
            '\n' => self.here.newline(),
            // `\r\n` cuenta como un único salto de línea
            '\r' if self.rest.starts_with('\n') => self.here,
            '\r' => self.here.newline(),
            '\t' => self.here.tab(),
            _ => self.here.advance(),
        };

        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.bump();
        }
    }
}

impl<'a> Lexer<'a> {
    /// Crea un lexer en estado inicial.
    pub fn new(source: &'a Rc<Source>) -> Self {
        let start = Position::default();
        Lexer {
            source: Rc::clone(source),
            cursor: Cursor {
                rest: source.text(),
                here: start,
            },
            state: State::Start,
            start,
        }
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Result<Option<Token>, LexerError> {
        use {State::*, Token::*};

        loop {
            let next_char = self.cursor.peek();

            // La posición de origen se mueve junto a la posición
            // siguiente siempre que no se haya encontrado una
            // frontera de token
            if let Start = self.state {
                self.start = self.cursor.here;

                if let Some(proverb) = self.proverb_call() {
                    self.state = Complete(Proverb(proverb));
                    continue;
                }
            }

            let line = self.start.line();

            // Switch table principal, determina cambios de estado
            // y de salida del lexer a partir de combinaciones del
            // estado actual y el siguiente carácter
            match (&mut self.state, next_char) {
                (Error, _) => return Ok(None),

                // Tokens triviales
                (Start, None) => return Ok(None),
                (Start, Some(':')) => self.state = Complete(Colon),
                (Start, Some('>')) => self.state = Complete(Greater),
                (Start, Some('=')) => self.state = EqualSign,
                (Start, Some('"')) => self.state = Text(String::new()),

                // Identificadores y palabras clave
                (Start, Some(c)) if is_word_start(c) => self.state = Word(c.to_string()),

                // Inicio de una constante numérica. No se consume el
                // dígito, ya que esa lógica está en el caso de estado
                // entero, por lo cual la constante es inicialmente cero.
                (Start, Some(c)) if c.is_ascii_digit() => {
                    self.state = Integer(0);
                    continue;
                }

                // Espacios en blanco y caracteres inesperados
                (Start, Some(' ' | '\t' | '\n' | '\r')) => (),
                (Start, Some(c)) => return Err(LexerError::BadChar { found: c, line }),

                // Emisión retardada de tokens cualesquiera
                (Complete(token), _) => return Ok(Some(std::mem::replace(token, Colon))),

                // `=` aislado no forma parte del lenguaje
                (EqualSign, Some('=')) => self.state = Complete(Token::Equal),
                (EqualSign, _) => return Err(LexerError::BadChar { found: '=', line }),

                // Acumulación dígito por dígito de constantes enteras
                (Integer(accumulated), Some(digit)) if digit.is_ascii_digit() => {
                    let digit = i64::from(digit as u8 - b'0');

                    match accumulated
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(digit))
                    {
                        Some(result) => *accumulated = result,
                        None => return Err(LexerError::IntOverflow { line }),
                    }
                }

                // Si sigue algo que no es un dígito, la constante ha terminado
                (Integer(integer), _) => return Ok(Some(IntLiteral(*integer))),

                // Extensión de términos
                (Word(word), Some(c)) if is_word_char(c) => word.push(c),

                // Si sigue algo que no puede formar parte del término, ha terminado
                (Word(word), _) => {
                    let token = match self::Keyword::from_str(word) {
                        Ok(keyword) => Keyword(keyword),
                        Err(()) => Id(Identifier::new(word)),
                    };

                    return Ok(Some(token));
                }

                // Una cadena vacía o sin cerrar se reporta en su comilla inicial
                (Text(text), Some('"')) if text.is_empty() => {
                    return Err(LexerError::BadChar { found: '"', line })
                }

                (Text(text), Some('"')) => {
                    self.state = Complete(StrLiteral(std::mem::take(text)));
                }

                (Text(_), None) => return Err(LexerError::BadChar { found: '"', line }),
                (Text(text), Some(c)) => text.push(c),
            }

            // Si no hubo `continue` o `return`, aquí se consume el
            // carácter que se observó con lookahead anteriormente
            self.cursor.bump();
        }
    }

    /// Intenta reconocer `PROVERBE(\s*"texto"\s*)` desde la posición actual.
    ///
    /// En caso de éxito, el cursor avanza hasta después de `)`. En caso
    /// contrario no se consume nada y `PROVERBE` se analizará como un
    /// identificador cualquiera.
    fn proverb_call(&mut self) -> Option<String> {
        if !self.cursor.rest.starts_with(PROVERB_CALL) {
            return None;
        }

        let mut fork = self.cursor;
        for _ in PROVERB_CALL.chars() {
            fork.bump();
        }

        fork.skip_whitespace();
        if fork.bump() != Some('"') {
            return None;
        }

        let mut text = String::new();
        loop {
            match fork.bump()? {
                '"' => break,
                c => text.push(c),
            }
        }

        fork.skip_whitespace();
        if text.is_empty() || fork.bump() != Some(')') {
            return None;
        }

        self.cursor = fork;

        let text = text.trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace());
        Some(text.to_owned())
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Located<Token>, Located<LexerError>>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.lex();
        let location = Location::new(Rc::clone(&self.source), self.start..self.cursor.here);

        match result {
            Ok(None) => None,
            Ok(Some(token)) => {
                self.state = State::Start;
                Some(Ok(Located::at(token, location)))
            }

            Err(error) => {
                self.state = State::Error;

                let here = self.start..self.start.advance();
                let location = Location::new(Rc::clone(&self.source), here);
                Some(Err(Located::at(error, location)))
            }
        }
    }
}

/// Determina si un carácter puede iniciar un término.
fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '_' | 'é' | 'è' | 'à')
}

/// Determina si un carácter puede pertenecer a un término.
fn is_word_char(c: char) -> bool {
    is_word_start(c) || c.is_ascii_digit()
}
