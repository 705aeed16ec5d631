//! Diccionario de proverbios y verificación de citas.
//!
//! Un [`ProverbDatabase`] asocia cada tema (identificador en mayúsculas,
//! único) con el texto de un proverbio. El orden de inserción se conserva,
//! ya que determina cuál entrada gana cuando un mismo texto o fragmento
//! aparece bajo varios temas.
//!
//! El diccionario es de solo lectura durante una compilación. Leerlo de o
//! escribirlo a un archivo es responsabilidad de quien lo construye.

use indexmap::IndexMap;
use std::{
    fmt::{self, Display},
    io::{self, BufRead, Write},
};

/// Resultado de buscar el texto de un `PROVERBE("...")` en el diccionario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verified {
    /// El texto coincide exactamente con un proverbio.
    Exact { theme: String, text: String },

    /// El texto es un fragmento de un proverbio más largo. Se conserva
    /// el texto completo del diccionario.
    Partial { theme: String, text: String },

    /// No se encontró ni siquiera como fragmento.
    Unknown(String),
}

impl Verified {
    /// Prefijo que etiqueta a una coincidencia parcial.
    pub const PARTIAL_TAG: &'static str = "ATTENTION: Partiel - ";

    /// Prefijo que etiqueta a un proverbio desconocido.
    pub const UNKNOWN_TAG: &'static str = "PROVERBE INCONNU: ";

    /// Lo que precede al primer `:` en la forma textual.
    ///
    /// Para una coincidencia exacta es el tema; para las demás es
    /// la etiqueta de resolución, que no es un tema.
    pub fn theme_token(&self) -> &str {
        let (tag, theme) = match self {
            Verified::Exact { theme, .. } => ("", theme.as_str()),
            Verified::Partial { .. } => (Verified::PARTIAL_TAG, ""),
            Verified::Unknown(_) => (Verified::UNKNOWN_TAG, ""),
        };

        let token = if tag.is_empty() { theme } else { tag };
        token.split(':').next().unwrap_or_default().trim()
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Verified::Partial { .. })
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Verified::Unknown(_))
    }
}

impl Display for Verified {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verified::Exact { theme, text } => write!(fmt, "{}: {}", theme, text),
            Verified::Partial { theme, text } => {
                write!(fmt, "{}{}: {}", Verified::PARTIAL_TAG, theme, text)
            }

            Verified::Unknown(text) => write!(fmt, "{}{}", Verified::UNKNOWN_TAG, text),
        }
    }
}

/// Diccionario tema → proverbio.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProverbDatabase {
    entries: IndexMap<String, String>,
}

impl ProverbDatabase {
    /// Un diccionario vacío.
    pub fn new() -> Self {
        Default::default()
    }

    /// El conjunto de proverbios tunecinos con el que se distribuye el compilador.
    pub fn defaults() -> Self {
        DEFAULTS.iter().copied().collect()
    }

    /// Agrega o reemplaza una entrada. Un reemplazo conserva la posición original.
    pub fn insert<T, P>(&mut self, theme: T, text: P) -> Option<String>
    where
        T: Into<String>,
        P: Into<String>,
    {
        self.entries.insert(theme.into(), text.into())
    }

    pub fn get(&self, theme: &str) -> Option<&str> {
        self.entries.get(theme).map(String::as_str)
    }

    pub fn contains_theme(&self, theme: &str) -> bool {
        self.entries.contains_key(theme)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pares `(tema, texto)` en orden de inserción.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(theme, text)| (theme.as_str(), text.as_str()))
    }

    /// Busca el texto citado en un `PROVERBE("...")`.
    ///
    /// Primero se intenta una coincidencia exacta contra todo el
    /// diccionario y solo después una parcial (el texto como fragmento
    /// no vacío de algún proverbio). En ambos casos gana la primera
    /// entrada en orden de inserción.
    pub fn verify(&self, quoted: &str) -> Verified {
        let text = normalize(quoted);

        if let Some((theme, full)) = self.iter().find(|&(_, full)| full == text) {
            return Verified::Exact {
                theme: theme.to_owned(),
                text: full.to_owned(),
            };
        }

        let partial = if text.is_empty() {
            None
        } else {
            self.iter().find(|&(_, full)| full.contains(text.as_str()))
        };

        match partial {
            Some((theme, full)) => Verified::Partial {
                theme: theme.to_owned(),
                text: full.to_owned(),
            },

            None => Verified::Unknown(text),
        }
    }

    /// Lee un diccionario en formato `TEMA:texto`, una entrada por línea.
    ///
    /// Cada línea se divide en el primer `:` y ambos lados se recortan.
    /// Las líneas sin `:` se ignoran.
    pub fn read<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut database = ProverbDatabase::new();
        for line in reader.lines() {
            let line = line?;
            if let Some((theme, text)) = line.split_once(':') {
                database.insert(theme.trim(), text.trim());
            }
        }

        log::debug!("loaded {} proverbs", database.len());
        Ok(database)
    }

    /// Escribe el diccionario en el mismo formato que acepta [`ProverbDatabase::read()`].
    pub fn write<W: Write>(&self, output: &mut W) -> io::Result<()> {
        for (theme, text) in self.iter() {
            writeln!(output, "{}:{}", theme, text)?;
        }

        Ok(())
    }
}

impl<T, P> FromIterator<(T, P)> for ProverbDatabase
where
    T: Into<String>,
    P: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (T, P)>>(iter: I) -> Self {
        let mut database = ProverbDatabase::new();
        for (theme, text) in iter {
            database.insert(theme, text);
        }

        database
    }
}

/// Remueve espacios y comillas circundantes, así como cualquier comilla interior.
fn normalize(quoted: &str) -> String {
    quoted
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .chars()
        .filter(|&c| c != '"' && c != '\'')
        .collect()
}

const DEFAULTS: &[(&str, &str)] = &[
    ("CONSEIL",            "أسمع كلام اللي يبكيك وماتسمعش كلام اللي يضحكك"),
    ("MODERATION",         "إذا صاحبك عسل ما تلحسوش الكل"),
    ("SAGESSE",            "إسأل مجرب ولا تسأل طبيب"),
    ("PRUDENCE",           "اللي خاف نجى"),
    ("GENEROSITE",         "أعمل الخير وارمي في البحر"),
    ("ADAPTATION",         "أعمل كيف جارك وإلا حول باب دارك"),
    ("COURAGE",            "اللي يخاف من العفريت يطلع له"),
    ("PREVENTION",         "شد مشومك لا يجيك ما اشوم"),
    ("SANTE",              "الصحة تاج على رؤوس الأصحاء"),
    ("VAINE",              "اللي ينام عالجرح يلاقي الربح"),
    ("BIENETRE",           "العقل السليم في الجسم السليم"),
    ("RICHESSE",           "اللي عندو ما يموتش"),
    ("DETTE",              "اللي عليه مليان، راهو خسران"),
    ("SATISFACTION",       "القناعة كنز لا يفنى"),
    ("METEO",              "اللي ما عندوش مطر، يستنا الندى"),
    ("AGRICULTURE",        "اللي يزرع حصاد"),
    ("PATIENCE",           "الصبر مفتاح الفرج"),
    ("EDUCATION",          "اللي يربّي العود يربّي الحصاد"),
    ("FAMILLE",            "اليد الواحدة ما تصفقش"),
    ("TEMPS",              "الوقت اللي ما يقدّرش يقدّرك"),
    ("AGE",                "الكبير كبير ولو طار"),
    ("JEUNESSE",           "اللي يستعجل ياكل خبز حار"),
    ("EXPERIENCE",         "الوقت شيخ"),
    ("OPPORTUNITE",        "اللي يغامر يربح"),
    ("NAVIGATION",         "المركب اللي ما تهزّش ما تمشّيش"),
    ("PECHE",              "اللي يخاف من الموج ما يفرشش"),
    ("AMITIE",             "إسأل على صاحبك إستغناش أما الطبيعة هي هي"),
    ("TRAHISON",           "البقرة كيف اتطيح تكثر اسكاكينها"),
    ("ESPOIR_DECU",        "عاش يتمني في عنبة مات جابولو عرجون"),
    ("INEFFICACITE",       "جا يعاون فيه على قبر بوه هربلو بالفاس"),
    ("REVANCHE",           "الّي يبيعك بالفول بيعو بالقشور"),
    ("INJUSTICE",          "عريان يسلب في ميت"),
    ("DESTINEE",           "الي ليك لك و الي خاطيك خاطيك"),
    ("ECHEC",              "جا يكحلها عماها"),
    ("VERITE",             "اللي فيه طبة عمرها ماتتخبى"),
    ("AUTOJUSTIFICATION",  "ضربو على قرعتو قال شعري طاح"),
    ("HERITAGE",           "ولد الفار يطلع حفار"),
    ("FOLIE",              "مهبولة و زغرتولها في وذنها"),
    ("OUBLI",              "ملي دفنوه مازاروه"),
    ("NOSTALGIE",          "اللي يبدل لحية بلحية يجي نهار يشتاقهم لثنين"),
    ("COINCIDENCE",        "فردة ولقات اختها"),
    ("ABUS",               "اللي يكثر مالعسل يمصاط"),
    ("IRONIE",             "قلو يقوي سعدك قلو توة توة"),
    ("CONTRASTE_ACTIONS",  "أعملْ الخير وأنساه واعْمل الشّر وتفكره"),
    ("RELIGION_TRAVAIL",   "أعمِلْ الفرض وانقب الأرض"),
    ("IMITATION",          "أعمِلْ كيف جارك وإلا حول باب دارك"),
    ("FIERTE",             "إللّي يعْرف عِزَو كلام الناس ما يهزو"),
    ("HUMILITE",           "كلّي راسو فيها وكلّي دارو فيها"),
    ("SOLIDARITE",         "اللي ما يعرفك ما يثمنك"),
    ("JUSTICE",            "اللي يزرع الشوك ما يجنيش الورد"),
    ("HONNETETE",          "الصدق منجى والكذب مهلك"),
    ("TRAVAIL",            "اليد اللي ما تقرضش ما تلسعش"),
    ("OPINIATRETE",        "اللي ما يسمعش كلام الناس يسمع كلام الراس"),
    ("CHANCE",             "اللي ما يربحش في القرعة يربح في اللقعة"),
    ("DISCERNEMENT",       "اللي ما يعرف الصقر يشويه"),
    ("OPPORTUNITE_PERDUE", "الفرصة ما تباتش تاني"),
    ("TEMERITE",           "اللي ما يخافش من الموت ما يخافش من الذكر"),
    ("AVARICE",            "اللي يبخل على نفسه كيفاش يبخل على الناس"),
    ("MALCHANCE",          "اللي ما يربحش في اللقعة يربح في القرعة"),
    ("INGRATITUDE",        "ربّي الكلب عاضك"),
    ("HYPOCRISIE",         "وجه حلو وقلب ملعون"),
    ("FATALISME",          "اللي كتب ليك يجيك ولو كان تحت الأرض"),
    ("DETERMINATION",      "اللي يخاف من العfريت يطلع له"),
    ("ESPOIR",             "الصبر مفتاح الفرج"),
    ("TEMPERANCE",         "اللي ياكل بزاف ياكلو بزاف"),
    ("RECONNAISSANCE",     "اللي يعمل المعروف يلقاه"),
    ("MEFIANCE",           "اللي يخاف من الشيطان يخاف من الظل"),
    ("AMBITION",           "اللي ما يطيرش عالعالية ينام في الحضيضة"),
    ("RUSE",               "اللي ما يعرفش يلعب بالعصا يلعب بالعصافير"),
    ("CHARITE",            "اليد اللي ما تعطي ما تاخدش"),
    ("HABITUDE",           "اللي يعود على الشيء يصير عليه"),
    ("DILIGENCE",          "اللي يستعجل ياكل خبز حار"),
    ("PRESCIENCE",         "اللي ما يعرفش آخر الدرب ما يمشيش في الليل"),
    ("OPINIATRE",          "اللي ما يسمعش كلام الناس يسمع كلام الراس"),
    ("PERSEVERANCE",       "اللي يضرب الحديد وهو بارد ما يطلعش منه نار"),
    ("CONFIANCE",          "اللي يثق في الناس ينام قرير العين"),
    ("MALADRESSE",         "اللي ما يعرفش يسبح يقول المي عميقة"),
    ("INGENIOSITE",        "اللي ما عندوش حبل يربط به الحمار يربطه بذنبه"),
    ("OPPORTUNISME",       "اللي ما يعرفش يلعب بالعصا يلعب بالعصافير"),
    ("PREVOYANCE",         "اللي ما يخيطش جرابه ينام حافي"),
    ("RENONCEMENT",        "اللي ما يقدرش على العنب يقول حامض"),
    ("AUDACE",             "اللي ما يخافش من اللي يموت ما يخافش من اللي يذبح"),
    ("FATIGUE",            "اللي ما ينامش بالليل ينام بالنهار"),
    ("OPPORTUNITE_SAISIE", "اللي يغتنم الفرصة ما يندمش"),
    ("PRECAUTION",         "اللي ما يخيطش جرابه ينام حافي"),
    ("DISCIPLINE",         "اللي ما يربّيش العود ما يربّيش الحصاد"),
    ("HONNEUR",            "اللي ما يخافش من الموت ما يخافش من الذكر"),
    ("SERENITE",           "اللي ما يهتمش بالدنيا ينام قرير العين"),
];

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn database() -> ProverbDatabase {
        [
            ("PATIENCE", "الصبر مفتاح الفرج"),
            ("ESPOIR", "الصبر مفتاح الفرج"),
            ("SAGESSE", "إسأل مجرب ولا تسأل طبيب"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn exact_match_takes_first_theme() {
        let verified = database().verify("الصبر مفتاح الفرج");
        assert_eq!(verified.to_string(), "PATIENCE: الصبر مفتاح الفرج");
        assert_eq!(verified.theme_token(), "PATIENCE");
    }

    #[test]
    fn partial_match_keeps_full_text() {
        let verified = database().verify("مجرب");
        assert!(verified.is_partial());
        assert_eq!(
            verified.to_string(),
            "ATTENTION: Partiel - SAGESSE: إسأل مجرب ولا تسأل طبيب"
        );
        assert_eq!(verified.theme_token(), "ATTENTION");
    }

    #[test]
    fn unknown_proverb() {
        let verified = database().verify("'ما نعرفوش'");
        assert_eq!(verified, Verified::Unknown(String::from("ما نعرفوش")));
        assert_eq!(verified.to_string(), "PROVERBE INCONNU: ما نعرفوش");
        assert_eq!(verified.theme_token(), "PROVERBE INCONNU");
    }

    #[test]
    fn empty_text_is_never_partial() {
        assert!(database().verify("''").is_unknown());
    }

    #[test]
    fn read_and_write_file_format() {
        let text = "CONSEIL : uno\nsin separador\nSAGESSE:dos: con dos puntos\n";
        let database = ProverbDatabase::read(text.as_bytes()).unwrap();

        assert_eq!(database.len(), 2);
        assert_eq!(database.get("CONSEIL"), Some("uno"));
        assert_eq!(database.get("SAGESSE"), Some("dos: con dos puntos"));

        let mut output = Vec::new();
        database.write(&mut output).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "CONSEIL:uno\nSAGESSE:dos: con dos puntos\n"
        );
    }

    #[test]
    fn defaults_are_complete() {
        let defaults = ProverbDatabase::defaults();
        assert_eq!(defaults.len(), 88);
        assert_eq!(defaults.iter().next().map(|(theme, _)| theme), Some("CONSEIL"));
        assert!(defaults.contains_theme("INEFFICACITE"));
        assert_eq!(
            defaults.verify("الصبر مفتاح الفرج").theme_token(),
            "PATIENCE"
        );
    }
}
