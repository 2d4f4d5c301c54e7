// ==========================================
// 薄膜生产管理系统 - API层错误类型
// ==========================================
// 职责: 转换 Repository 错误为用户友好的错误消息
// 纪律: 所有错误信息必须包含显式原因
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("重复分配: 工单{order_id}已在机台{machine_id}队列中")]
    DuplicateAssignment {
        order_id: String,
        machine_id: String,
    },

    #[error("非法队列位置: position={position}, 队列长度={queue_len}")]
    InvalidPosition { position: i64, queue_len: i64 },

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户可解释的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 队列约束错误
            RepositoryError::DuplicateAssignment {
                order_id,
                machine_id,
            } => ApiError::DuplicateAssignment {
                order_id,
                machine_id,
            },
            RepositoryError::InvalidPosition {
                position,
                queue_len,
            } => ApiError::InvalidPosition {
                position,
                queue_len,
            },

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::InvalidInput(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        // NotFound错误转换
        let repo_err = RepositoryError::NotFound {
            entity: "Machine".to_string(),
            id: "machine_A".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Machine"));
                assert!(msg.contains("machine_A"));
            }
            _ => panic!("Expected NotFound"),
        }

        // 重复分配错误保留结构化字段
        let repo_err = RepositoryError::DuplicateAssignment {
            order_id: "order_7".to_string(),
            machine_id: "machine_B".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::DuplicateAssignment {
                order_id,
                machine_id,
            } => {
                assert_eq!(order_id, "order_7");
                assert_eq!(machine_id, "machine_B");
            }
            _ => panic!("Expected DuplicateAssignment"),
        }
    }
}
