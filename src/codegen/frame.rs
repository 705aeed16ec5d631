//! Memoria del programa objetivo: ranuras del stack frame y literales.

use indexmap::IndexSet;
use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use crate::ir::Temp;

/// Primer desplazamiento libre bajo `ebp`.
const BASE_OFFSET: u32 = 8;

/// Tamaño de una ranura.
const SLOT_SIZE: u32 = 4;

/// Asignación de temporales a desplazamientos bajo `ebp`.
///
/// `t<N>` siempre ocupa `[ebp-4*(N+2)]`. La marca de agua alta avanza
/// cada vez que se toca una ranura más profunda que las anteriores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    slots: BTreeMap<Temp, u32>,
    high_water: u32,
}

impl Default for Frame {
    fn default() -> Self {
        Frame {
            slots: BTreeMap::new(),
            high_water: BASE_OFFSET,
        }
    }
}

impl Frame {
    /// Desplazamiento de un temporal, reservándolo si es la primera vez.
    ///
    /// Los temporales leídos de texto nunca exceden [`crate::ir::MAX_TEMP`];
    /// uno construido a mano más allá de ese límite satura en vez de desbordar.
    pub fn slot(&mut self, Temp(temp): Temp) -> u32 {
        let offset = temp.saturating_add(2).saturating_mul(SLOT_SIZE);
        if offset >= self.high_water {
            self.high_water = offset.saturating_add(SLOT_SIZE);
        }

        self.slots.insert(Temp(temp), offset);
        offset
    }

    pub fn offset(&self, temp: Temp) -> Option<u32> {
        self.slots.get(&temp).copied()
    }

    /// Bytes que el prólogo debe reservar.
    pub fn size(&self) -> u32 {
        self.high_water - BASE_OFFSET
    }

    pub fn iter(&self) -> impl Iterator<Item = (Temp, u32)> + '_ {
        self.slots.iter().map(|(&temp, &offset)| (temp, offset))
    }
}

/// Etiqueta `str_<k>` de un literal en la sección de datos.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StringLabel(pub usize);

impl Display for StringLabel {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "str_{}", self.0)
    }
}

/// Literales de cadena, sin repetidos, en orden de primera aparición.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    strings: IndexSet<String>,
}

impl StringTable {
    pub fn intern(&mut self, text: &str) -> StringLabel {
        match self.strings.get_index_of(text) {
            Some(index) => StringLabel(index),
            None => {
                let (index, _) = self.strings.insert_full(text.to_owned());
                StringLabel(index)
            }
        }
    }

    pub fn get(&self, text: &str) -> Option<StringLabel> {
        self.strings.get_index_of(text).map(StringLabel)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StringLabel, &str)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(index, text)| (StringLabel(index), text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_follow_temp_numbers() {
        let mut frame = Frame::default();
        assert_eq!(frame.size(), 0);

        assert_eq!(frame.slot(Temp(2)), 16);
        assert_eq!(frame.size(), 12);

        // Una ranura menos profunda no mueve la marca
        assert_eq!(frame.slot(Temp(1)), 12);
        assert_eq!(frame.size(), 12);

        assert_eq!(frame.offset(Temp(1)), Some(12));
        assert_eq!(frame.offset(Temp(7)), None);
        assert_eq!(frame.iter().collect::<Vec<_>>(), [(Temp(1), 12), (Temp(2), 16)]);
    }

    #[test]
    fn huge_temps_saturate() {
        let mut frame = Frame::default();

        assert_eq!(frame.slot(Temp(u32::MAX)), u32::MAX);
        assert_eq!(frame.size(), u32::MAX - 8);
    }

    #[test]
    fn strings_are_deduplicated() {
        let mut strings = StringTable::default();

        assert_eq!(strings.intern("CONSEIL: a"), StringLabel(0));
        assert_eq!(strings.intern("triste"), StringLabel(1));
        assert_eq!(strings.intern("CONSEIL: a"), StringLabel(0));
        assert_eq!(strings.len(), 2);
        assert_eq!(strings.get("triste").map(|label| label.to_string()), Some(String::from("str_1")));
    }
}
