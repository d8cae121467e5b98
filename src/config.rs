use crate::image::PreprocessOptions;
use crate::utils::error::DigitError;
use crate::Result;
use std::net::SocketAddr;
use std::path::PathBuf;

/// 训练脚本导出模型的默认位置
pub const DEFAULT_MODEL_PATH: &str = "models/handwritten_digits.onnx";
/// 批处理模式默认扫描目录
pub const DEFAULT_DIGITS_DIR: &str = "digits";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器绑定地址
    pub bind_addr: String,

    /// ONNX模型文件
    pub model_path: PathBuf,

    /// digit1.png, digit2.png, ... 所在目录
    pub digits_dir: PathBuf,

    /// 工作线程数量
    pub workers: usize,

    /// 开发模式
    pub dev_mode: bool,

    /// ONNX Runtime配置
    pub onnx_config: OnnxConfig,

    /// 服务器配置
    pub server_config: ServerConfig,

    /// 预处理配置
    pub preprocess: PreprocessOptions,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// CPU线程数
    pub intra_threads: usize,

    /// 优化级别 (0-3)
    pub optimization_level: u8,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 请求超时时间（秒）
    pub request_timeout: u64,

    /// 最大请求体大小（字节）
    pub max_request_size: usize,
}

impl Config {
    pub fn new(
        bind_addr: String,
        model_path: PathBuf,
        digits_dir: PathBuf,
        workers: Option<usize>,
        dev_mode: bool,
    ) -> Result<Self> {
        let cpu_cores = num_cpus::get();
        let workers = workers.unwrap_or(cpu_cores);
        if workers == 0 {
            return Err(DigitError::Config(
                "worker thread count must be at least 1".to_string(),
            ));
        }

        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores * 3 / 4).max(1), // 使用75%的CPU核心
            optimization_level: 3,
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 60 },
            max_request_size: 50 * 1024 * 1024, // 50MB
        };

        Ok(Self {
            bind_addr,
            model_path,
            digits_dir,
            workers,
            dev_mode,
            onnx_config,
            server_config,
            preprocess: PreprocessOptions::default(),
        })
    }

    pub fn with_preprocess(mut self, preprocess: PreprocessOptions) -> Self {
        self.preprocess = preprocess;
        self
    }

    /// 解析绑定地址
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr.parse().map_err(|e| {
            DigitError::Config(format!("Invalid bind address {}: {}", self.bind_addr, e))
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        let cpu_cores = num_cpus::get();
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            digits_dir: PathBuf::from(DEFAULT_DIGITS_DIR),
            workers: cpu_cores,
            dev_mode: false,
            onnx_config: OnnxConfig {
                intra_threads: (cpu_cores * 3 / 4).max(1),
                optimization_level: 3,
            },
            server_config: ServerConfig {
                request_timeout: 60,
                max_request_size: 50 * 1024 * 1024,
            },
            preprocess: PreprocessOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_mode_extends_timeout() {
        let config = Config::new(
            DEFAULT_BIND_ADDR.to_string(),
            PathBuf::from(DEFAULT_MODEL_PATH),
            PathBuf::from(DEFAULT_DIGITS_DIR),
            Some(2),
            true,
        )
        .unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.server_config.request_timeout, 300);
        assert!(config.onnx_config.intra_threads >= 1);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let result = Config::new(
            DEFAULT_BIND_ADDR.to_string(),
            PathBuf::from(DEFAULT_MODEL_PATH),
            PathBuf::from(DEFAULT_DIGITS_DIR),
            Some(0),
            false,
        );
        assert!(matches!(result, Err(DigitError::Config(_))));
    }

    #[test]
    fn bind_address_is_validated() {
        let mut config = Config::default();
        assert!(config.socket_addr().is_ok());

        config.bind_addr = "not-an-address".to_string();
        assert!(matches!(config.socket_addr(), Err(DigitError::Config(_))));
    }
}
