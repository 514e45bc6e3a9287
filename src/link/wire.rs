//! Формат кадра, которым сессии обмениваются через линки.
//!
//! Кадр сериализуется `bincode`-ом. Первое поле хранит версию формата, кадры
//! неизвестной версии отклоняются при декодировании.

use bytes::Bytes;
use keyroute_error::LinkError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    keyexpr::KeyExpr,
    pubsub::{Sample, SampleKind, Timestamp},
};

/// Текущая версия формата кадра.
pub const WIRE_VERSION: u8 = 1;

/// Сэмпл в пути между сессиями.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFrame {
    pub version: u8,
    /// Сессия, опубликовавшая сэмпл
    pub origin: Uuid,
    /// Сколько раз кадр был переслан
    pub hops: u8,
    pub key: KeyExpr,
    pub kind: SampleKind,
    pub timestamp: Timestamp,
    pub payload: Bytes,
}

impl WireFrame {
    pub fn from_sample(
        sample: &Sample,
        origin: Uuid,
    ) -> Self {
        Self {
            version: WIRE_VERSION,
            origin,
            hops: 0,
            key: sample.key_expr().clone(),
            kind: sample.kind(),
            timestamp: sample.timestamp(),
            payload: sample.payload().clone(),
        }
    }

    pub fn encode(&self) -> Result<Bytes, LinkError> {
        bincode::serialize(self)
            .map(Bytes::from)
            .map_err(|e| LinkError::Encode {
                reason: e.to_string(),
            })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, LinkError> {
        let version = *bytes.first().ok_or_else(|| LinkError::Decode {
            reason: "empty frame".into(),
        })?;
        if version != WIRE_VERSION {
            return Err(LinkError::Decode {
                reason: format!("unsupported wire version {version}"),
            });
        }
        bincode::deserialize(bytes).map_err(|e| LinkError::Decode {
            reason: e.to_string(),
        })
    }

    /// Копия кадра для пересылки дальше.
    pub fn relayed(&self) -> Self {
        Self {
            hops: self.hops.saturating_add(1),
            ..self.clone()
        }
    }

    /// Восстанавливает сэмпл. Ключ с wildcard-ами считается битым кадром.
    pub fn to_sample(&self) -> Result<Sample, LinkError> {
        Sample::new(
            self.key.clone(),
            self.payload.clone(),
            self.kind,
            self.timestamp,
        )
        .map_err(|e| LinkError::Decode {
            reason: e.to_string(),
        })
    }
}
