//! Rastreo de ubicaciones originales en código fuente.
//!
//! Tokens, nodos del AST y hallazgos semánticos llevan cuenta de la
//! posición o rango de posiciones de donde provienen, lo cual permite
//! señalar la línea exacta en la que ocurre un error y mostrarla junto
//! al diagnóstico.

use std::{
    fmt::{self, Debug, Display, Formatter},
    ops::Range,
    rc::Rc,
};

/// Ancho de los divisores de tabulador.
const TAB_STOP: u32 = 4;

/// Un conjunto de reglas tal como fue entregado al compilador.
#[derive(Debug)]
pub struct Source {
    name: String,
    text: String,
}

impl Source {
    /// Construye un origen a partir de un nombre (archivo, `<stdin>`, etc.) y su texto.
    pub fn new<N, T>(name: N, text: T) -> Rc<Self>
    where
        N: Into<String>,
        T: Into<String>,
    {
        Rc::new(Source {
            name: name.into(),
            text: text.into(),
        })
    }

    /// Nombre del origen.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Texto completo.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Ubicación del primer carácter.
    pub fn start(self: &Rc<Self>) -> Location {
        let start = Position::default();
        Location {
            from: Rc::clone(self),
            position: start..start.advance(),
        }
    }

    /// Invoca a `callback` con el contenido de una línea, sin su terminador.
    ///
    /// Se aceptan `\n`, `\r\n` y `\r` aislado como fin de línea. Una línea
    /// inexistente se presenta como vacía.
    pub fn with_line<R, F>(&self, line: u32, callback: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let mut current = 1;
        let mut begin = 0;
        let mut chars = self.text.char_indices().peekable();

        while let Some((index, c)) = chars.next() {
            let end_of_line = match c {
                '\n' => Some(index + 1),
                '\r' => match chars.peek() {
                    Some((_, '\n')) => {
                        chars.next();
                        Some(index + 2)
                    }

                    _ => Some(index + 1),
                },

                _ => None,
            };

            if let Some(next_begin) = end_of_line {
                if current == line {
                    return callback(&self.text[begin..index]);
                }

                current += 1;
                begin = next_begin;
            }
        }

        if current == line {
            callback(&self.text[begin..])
        } else {
            callback("")
        }
    }
}

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    /// Transforma el valor con la misma ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            location: self.location,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T: PartialEq> PartialEq for Located<T> {
    // La ubicación no participa en la igualdad
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

/// Una ubicación está conformada por un origen y un rango de posiciones.
///
/// El final del rango es exclusivo: apunta a la columna que sigue
/// al último carácter cubierto.
#[derive(Clone)]
pub struct Location {
    from: Rc<Source>,
    position: Range<Position>,
}

impl Location {
    /// Construye una ubicación entre dos posiciones de un mismo origen.
    pub fn new(from: Rc<Source>, position: Range<Position>) -> Self {
        Location { from, position }
    }

    /// Obtiene el origen.
    pub fn source(&self) -> &Source {
        &self.from
    }

    /// Obtiene la posición de inicio.
    pub fn start(&self) -> Position {
        self.position.start
    }

    /// Obtiene la posición de fin.
    pub fn end(&self) -> Position {
        self.position.end
    }

    /// Número de línea donde inicia.
    pub fn line(&self) -> u32 {
        self.position.start.line
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:", self.from.name)?;

        let Range { start, end } = self.position;
        if end == start.advance() || end == start {
            // Solo se señala una columna en específico
            write!(formatter, "{}", start)
        } else {
            write!(formatter, "[{}-{}]", start, end.back())
        }
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna en un archivo.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Incrementa el número de columna.
    pub fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Decrementa el número de columna.
    pub fn back(self) -> Position {
        Position {
            line: self.line,
            column: self.column.saturating_sub(1).max(1),
        }
    }

    /// Incrementa el número de línea y retorna a la columna 1.
    pub fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }

    /// Ajusta la posición a la siguiente columna de tabulador.
    pub fn tab(self) -> Position {
        let column = 1 + ((self.column - 1) / TAB_STOP + 1) * TAB_STOP;
        Position {
            line: self.line,
            column,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_with_mixed_terminators() {
        let source = Source::new("<test>", "uno\r\ndos\rtres\ncuatro");

        let lines: Vec<String> = (1..=5)
            .map(|line| source.with_line(line, str::to_owned))
            .collect();

        assert_eq!(lines, ["uno", "dos", "tres", "cuatro", ""]);
    }

    #[test]
    fn tab_stops() {
        let start = Position::default();
        assert_eq!(start.tab().column(), 5);
        assert_eq!(start.advance().advance().tab().column(), 5);
        assert_eq!(Position { line: 1, column: 5 }.tab().column(), 9);
    }

    #[test]
    fn location_display() {
        let source = Source::new("reglas.txt", "si age > 18");
        let start = source.start();
        assert_eq!(start.to_string(), "reglas.txt:1:1");

        let wide = Location::new(
            Rc::clone(&source),
            Position { line: 1, column: 4 }..Position { line: 1, column: 7 },
        );
        assert_eq!(wide.to_string(), "reglas.txt:[1:4-1:6]");
    }
}
