use keyroute_error::ConfigError;
use serde::{Deserialize, Serialize};

/// Настройки сессии.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Число рабочих задач, обрабатывающих входящие кадры
    pub work_thread_num: usize,
    /// Ёмкость очереди входящих кадров
    pub queue_capacity: usize,
    /// Endpoint-ы, к которым сессия подключается при открытии
    pub endpoints: Vec<String>,
    /// Пересылать ли входящие кадры в остальные линки
    pub relay: bool,
    /// Предел пересылок одного кадра
    pub max_relay_hops: u8,
    /// Принимать ли кадры из линков
    pub inbound: bool,
    /// Отправлять ли публикации и пересылки в линки
    pub outbound: bool,
}

#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    work_thread_num: Option<usize>,
    queue_capacity: Option<usize>,
    endpoints: Vec<String>,
    relay: Option<bool>,
    max_relay_hops: Option<u8>,
    inbound: Option<bool>,
    outbound: Option<bool>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Проверяет, что все размеры положительны.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.work_thread_num == 0 {
            return Err(invalid("session.work_thread_num", "must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("session.queue_capacity", "must be at least 1"));
        }
        if self.max_relay_hops == 0 {
            return Err(invalid("session.max_relay_hops", "must be at least 1"));
        }
        if let Some(bad) = self.endpoints.iter().find(|e| e.trim().is_empty()) {
            return Err(invalid(
                "session.endpoints",
                &format!("empty endpoint '{bad}'"),
            ));
        }
        Ok(())
    }
}

fn invalid(
    field: &str,
    reason: &str,
) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

impl SessionConfigBuilder {
    pub fn work_thread_num(
        mut self,
        n: usize,
    ) -> Self {
        self.work_thread_num = Some(n);
        self
    }

    pub fn queue_capacity(
        mut self,
        capacity: usize,
    ) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    pub fn endpoint(
        mut self,
        endpoint: impl Into<String>,
    ) -> Self {
        self.endpoints.push(endpoint.into());
        self
    }

    pub fn relay(
        mut self,
        relay: bool,
    ) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn max_relay_hops(
        mut self,
        hops: u8,
    ) -> Self {
        self.max_relay_hops = Some(hops);
        self
    }

    pub fn inbound(
        mut self,
        enabled: bool,
    ) -> Self {
        self.inbound = Some(enabled);
        self
    }

    pub fn outbound(
        mut self,
        enabled: bool,
    ) -> Self {
        self.outbound = Some(enabled);
        self
    }

    pub fn build(self) -> SessionConfig {
        let default = SessionConfig::default();
        SessionConfig {
            work_thread_num: self.work_thread_num.unwrap_or(default.work_thread_num),
            queue_capacity: self.queue_capacity.unwrap_or(default.queue_capacity),
            endpoints: self.endpoints,
            relay: self.relay.unwrap_or(default.relay),
            max_relay_hops: self.max_relay_hops.unwrap_or(default.max_relay_hops),
            inbound: self.inbound.unwrap_or(default.inbound),
            outbound: self.outbound.unwrap_or(default.outbound),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для SessionConfig
////////////////////////////////////////////////////////////////////////////////

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            work_thread_num: 2,
            queue_capacity: 1024,
            endpoints: Vec::new(),
            relay: false,
            max_relay_hops: 4,
            inbound: true,
            outbound: true,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
