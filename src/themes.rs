//! Temas esperados por condición.
//!
//! Cada variable conocida tiene un grupo de reglas que indica qué temas
//! de proverbio son coherentes con una condición sobre ella. Un grupo es
//! categórico (valor de cadena → temas) o por rangos numéricos cerrados
//! (`[min, max]` → temas). Los rangos de un grupo no se traslapan y el
//! último puede quedar abierto hacia +∞.
//!
//! La tabla se construye una sola vez y se comparte por referencia; el
//! análisis semántico nunca la modifica.

use indexmap::IndexMap;
use std::collections::BTreeSet;

use crate::{parse::Value, semantic::Type};

/// Un rango numérico cerrado. `max == None` representa +∞.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeRange {
    min: i64,
    max: Option<i64>,
    themes: Vec<String>,
}

impl ThemeRange {
    pub fn contains(&self, value: i64) -> bool {
        self.min <= value && self.max.map_or(true, |max| value <= max)
    }

    pub fn themes(&self) -> &[String] {
        &self.themes
    }
}

/// Reglas para una variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleGroup {
    Categorical(IndexMap<String, Vec<String>>),
    Ranges(Vec<ThemeRange>),
}

impl RuleGroup {
    /// El tipo que debe tener toda variable regida por este grupo.
    pub fn declared_type(&self) -> Type {
        match self {
            RuleGroup::Categorical(_) => Type::String,
            RuleGroup::Ranges(_) => Type::Number,
        }
    }

    /// Temas de todas las reglas del grupo.
    fn all_themes(&self) -> BTreeSet<String> {
        match self {
            RuleGroup::Categorical(categories) => {
                categories.values().flatten().cloned().collect()
            }

            RuleGroup::Ranges(ranges) => ranges
                .iter()
                .flat_map(|range| range.themes.iter().cloned())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeExpectations {
    groups: IndexMap<String, RuleGroup>,
}

impl ThemeExpectations {
    /// Una tabla vacía, sin variables conocidas.
    pub fn new() -> Self {
        Default::default()
    }

    /// Agrega un grupo categórico.
    pub fn categorical<'a, C, T>(mut self, var: &str, categories: C) -> Self
    where
        C: IntoIterator<Item = (&'a str, T)>,
        T: IntoIterator<Item = &'a str>,
    {
        let categories = categories
            .into_iter()
            .map(|(value, themes)| (value.to_owned(), owned(themes)))
            .collect();

        self.groups.insert(var.to_owned(), RuleGroup::Categorical(categories));
        self
    }

    /// Agrega un grupo de rangos `[min, max]`, en orden ascendente.
    pub fn ranges<'a, R, T>(mut self, var: &str, ranges: R) -> Self
    where
        R: IntoIterator<Item = (i64, Option<i64>, T)>,
        T: IntoIterator<Item = &'a str>,
    {
        let ranges = ranges
            .into_iter()
            .map(|(min, max, themes)| ThemeRange {
                min,
                max,
                themes: owned(themes),
            })
            .collect();

        self.groups.insert(var.to_owned(), RuleGroup::Ranges(ranges));
        self
    }

    /// La tabla de correspondencias con la que se distribuye el compilador.
    pub fn defaults() -> Self {
        ThemeExpectations::new()
            .categorical(
                "humeur",
                [
                    ("triste", ["CONSEIL", "PATIENCE", "SOLIDARITE"]),
                    ("joyeuse", ["BIENETRE", "SATISFACTION", "FIERTE"]),
                    ("colere", ["PRUDENCE", "MODERATION", "TEMPERANCE"]),
                    ("peur", ["COURAGE", "DETERMINATION", "TEMERITE"]),
                ],
            )
            .categorical(
                "besoin",
                [
                    ("conseil", ["CONSEIL", "SAGESSE", "EXPERIENCE"]),
                    ("aide", ["SOLIDARITE", "GENEROSITE", "CHARITE"]),
                    ("argent", ["RICHESSE", "DETTE", "SATISFACTION"]),
                    ("sante", ["SANTE", "BIENETRE", "PATIENCE"]),
                ],
            )
            .categorical(
                "situation",
                [
                    ("difficile", ["PERSEVERANCE", "PATIENCE", "ESPOIR"]),
                    ("facile", ["MODERATION", "PRUDENCE", "HUMILITE"]),
                    ("dangereuse", ["COURAGE", "PRUDENCE", "PREVENTION"]),
                    ("incertaine", ["PATIENCE", "SAGESSE", "PREVOYANCE"]),
                ],
            )
            .ranges(
                "age",
                [
                    (0, Some(18), ["JEUNESSE", "EDUCATION", "DISCIPLINE"]),
                    (19, Some(40), ["AMBITION", "TRAVAIL", "OPPORTUNITE"]),
                    (41, Some(60), ["SAGESSE", "EXPERIENCE", "PRUDENCE"]),
                    (61, Some(150), ["AGE", "PATIENCE", "SATISFACTION"]),
                ],
            )
            .ranges(
                "richesse",
                [
                    (0, Some(1000), ["SATISFACTION", "GENEROSITE", "TRAVAIL"]),
                    (1001, Some(10000), ["RICHESSE", "PRUDENCE", "MODERATION"]),
                    (10001, Some(100000), ["GENEROSITE", "CHARITE", "HONNETETE"]),
                    (100001, None, ["AVARICE", "OPPORTUNISME", "HYPOCRISIE"]),
                ],
            )
    }

    pub fn group(&self, var: &str) -> Option<&RuleGroup> {
        self.groups.get(var)
    }

    /// Temas coherentes con una condición `var op value`.
    ///
    /// Sin valor, o con un valor que no aplica al grupo (categoría
    /// desconocida, cadena contra rangos), se toma la unión de todas las
    /// reglas de la variable. Una variable desconocida no tiene temas.
    pub fn expected_themes(&self, var: &str, value: Option<&Value>) -> BTreeSet<String> {
        let group = match self.groups.get(var) {
            Some(group) => group,
            None => return BTreeSet::new(),
        };

        match (group, value) {
            (RuleGroup::Categorical(categories), Some(Value::Text(category))) => {
                match categories.get(category.as_str()) {
                    Some(themes) => themes.iter().cloned().collect(),
                    None => group.all_themes(),
                }
            }

            // Se unen todos los rangos que contienen al valor, no solo el primero
            (RuleGroup::Ranges(ranges), Some(Value::Number(number))) => ranges
                .iter()
                .filter(|range| range.contains(*number))
                .flat_map(|range| range.themes.iter().cloned())
                .collect(),

            _ => group.all_themes(),
        }
    }
}

fn owned<'a, T: IntoIterator<Item = &'a str>>(themes: T) -> Vec<String> {
    themes.into_iter().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(themes: &[&str]) -> BTreeSet<String> {
        themes.iter().map(|&theme| theme.to_owned()).collect()
    }

    #[test]
    fn known_category() {
        let expectations = ThemeExpectations::defaults();
        let triste = Value::Text(String::from("triste"));

        assert_eq!(
            expectations.expected_themes("humeur", Some(&triste)),
            set(&["CONSEIL", "PATIENCE", "SOLIDARITE"])
        );
    }

    #[test]
    fn unknown_category_takes_every_theme() {
        let expectations = ThemeExpectations::defaults();
        let unknown = Value::Text(String::from("perplexe"));

        let all = expectations.expected_themes("humeur", None);
        assert_eq!(all.len(), 12);
        assert_eq!(expectations.expected_themes("humeur", Some(&unknown)), all);
    }

    #[test]
    fn inclusive_ranges() {
        let expectations = ThemeExpectations::defaults();

        let at = |age| expectations.expected_themes("age", Some(&Value::Number(age)));
        assert_eq!(at(18), set(&["JEUNESSE", "EDUCATION", "DISCIPLINE"]));
        assert_eq!(at(60), set(&["SAGESSE", "EXPERIENCE", "PRUDENCE"]));
        assert_eq!(at(61), set(&["AGE", "PATIENCE", "SATISFACTION"]));
        assert!(at(151).is_empty());
    }

    #[test]
    fn open_ended_range() {
        let expectations = ThemeExpectations::defaults();
        let rich = Value::Number(5_000_000);

        assert_eq!(
            expectations.expected_themes("richesse", Some(&rich)),
            set(&["AVARICE", "OPPORTUNISME", "HYPOCRISIE"])
        );
    }

    #[test]
    fn overlapping_ranges_are_united() {
        let expectations = ThemeExpectations::new().ranges(
            "n",
            [(0, Some(10), ["A"]), (5, None, ["B"])],
        );

        assert_eq!(
            expectations.expected_themes("n", Some(&Value::Number(7))),
            set(&["A", "B"])
        );
    }

    #[test]
    fn text_against_ranges_takes_every_theme() {
        let expectations = ThemeExpectations::defaults();
        let text = Value::Text(String::from("soixante"));

        let themes = expectations.expected_themes("age", Some(&text));
        assert_eq!(themes.len(), 12);
        assert!(themes.contains("AGE"));
    }

    #[test]
    fn unknown_variable() {
        let expectations = ThemeExpectations::defaults();
        assert!(expectations.expected_themes("meteo", None).is_empty());
        assert!(expectations.group("meteo").is_none());
        assert_eq!(
            expectations.group("age").map(RuleGroup::declared_type),
            Some(Type::Number)
        );
    }
}
