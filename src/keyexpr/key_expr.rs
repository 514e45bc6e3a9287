use std::{fmt, str::FromStr, sync::Arc};

use keyroute_error::KeyExprError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::matcher;

/// Один сегмент ключевого выражения.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Литерал, сравнивается побайтно (с учётом регистра)
    Literal(Arc<str>),
    /// `*`: ровно один сегмент
    Single,
    /// `**`: ноль или больше сегментов
    Multi,
}

/// Иерархическое ключевое выражение вида `a/*/c/**`.
///
/// Неизменяемо после разбора. Соседние `**` схлопываются в один, поэтому
/// строковое представление всегда каноническое.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyExpr {
    canonical: Arc<str>,
    segments: Arc<[Segment]>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Segment {
    pub fn is_wildcard(&self) -> bool {
        !matches!(self, Segment::Literal(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Segment::Literal(s) => s,
            Segment::Single => "*",
            Segment::Multi => "**",
        }
    }
}

impl KeyExpr {
    /// Разбирает выражение.
    ///
    /// # Ошибки
    /// - [`KeyExprError::Empty`] для пустой строки;
    /// - [`KeyExprError::EmptySegment`] для `a//b`, `/a`, `a/`;
    /// - [`KeyExprError::InvalidWildcard`] для `a*`, `***`;
    /// - [`KeyExprError::InvalidChar`] для `#`, `?`, `$`, пробелов и
    ///   управляющих символов.
    pub fn parse(expr: &str) -> Result<Self, KeyExprError> {
        if expr.is_empty() {
            return Err(KeyExprError::Empty);
        }

        let mut segments: Vec<Segment> = Vec::new();
        for (position, raw) in expr.split('/').enumerate() {
            let segment = parse_segment(expr, position, raw)?;
            if segment == Segment::Multi && segments.last() == Some(&Segment::Multi) {
                continue;
            }
            segments.push(segment);
        }

        let canonical = segments
            .iter()
            .map(Segment::as_str)
            .collect::<Vec<_>>()
            .join("/");

        Ok(Self {
            canonical: Arc::from(canonical),
            segments: segments.into(),
        })
    }

    /// Разбирает выражение и требует, чтобы в нём не было wildcard-ов.
    pub fn concrete(expr: &str) -> Result<Self, KeyExprError> {
        let key = Self::parse(expr)?;
        if !key.is_concrete() {
            return Err(KeyExprError::NotConcrete {
                expr: expr.to_string(),
            });
        }
        Ok(key)
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// `true`, если в выражении нет `*` и `**`.
    pub fn is_concrete(&self) -> bool {
        !self.segments.iter().any(Segment::is_wildcard)
    }

    /// Совпадает ли конкретный ключ `key` с этим шаблоном.
    ///
    /// Ключ с wildcard-ами никогда не совпадает: для двух шаблонов есть
    /// [`KeyExpr::intersects`].
    pub fn matches(
        &self,
        key: &KeyExpr,
    ) -> bool {
        key.is_concrete() && matcher::intersect(&self.segments, &key.segments)
    }

    /// Существует ли конкретный ключ, подходящий под оба выражения.
    pub fn intersects(
        &self,
        other: &KeyExpr,
    ) -> bool {
        matcher::intersect(&self.segments, &other.segments)
    }
}

fn parse_segment(
    expr: &str,
    position: usize,
    raw: &str,
) -> Result<Segment, KeyExprError> {
    match raw {
        "" => Err(KeyExprError::EmptySegment {
            expr: expr.to_string(),
            position,
        }),
        "*" => Ok(Segment::Single),
        "**" => Ok(Segment::Multi),
        _ if raw.contains('*') => Err(KeyExprError::InvalidWildcard {
            expr: expr.to_string(),
            segment: raw.to_string(),
        }),
        _ => match raw.chars().find(|c| is_forbidden(*c)) {
            Some(ch) => Err(KeyExprError::InvalidChar {
                expr: expr.to_string(),
                ch,
            }),
            None => Ok(Segment::Literal(Arc::from(raw))),
        },
    }
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '#' | '?' | '$') || c.is_whitespace() || c.is_control()
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для KeyExpr
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for KeyExpr {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl fmt::Debug for KeyExpr {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "KeyExpr({:?})", &*self.canonical)
    }
}

impl FromStr for KeyExpr {
    type Err = KeyExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for KeyExpr {
    type Error = KeyExprError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<String> for KeyExpr {
    type Error = KeyExprError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl TryFrom<&String> for KeyExpr {
    type Error = KeyExprError;

    fn try_from(s: &String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl AsRef<str> for KeyExpr {
    fn as_ref(&self) -> &str {
        &self.canonical
    }
}

impl Serialize for KeyExpr {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical)
    }
}

impl<'de> Deserialize<'de> for KeyExpr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        KeyExpr::parse(&s).map_err(serde::de::Error::custom)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
