pub mod agent_code;
pub mod aura_service;
pub mod error;
pub mod error_log;
pub mod notification_service;
pub mod roles;
pub mod session_activity;
pub mod storage;
pub mod upload_service;
pub mod watermark_service;
