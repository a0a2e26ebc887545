//! 설정 파일 관리.
//!
//! 플랫폼별 설정 디렉토리의 JSON 파일을 기본 레이어로, `SKINSIGHT__섹션__키`
//! 환경 변수를 덮어쓰기 레이어로 병합해 `GuidanceConfig`를 만든다.

use crate::config::GuidanceConfig;
use crate::error::CoreError;
use config::{Environment, File, FileFormat, Map};
use directories::ProjectDirs;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// 설정 파일 이름
const CONFIG_FILE_NAME: &str = "config.json";

/// 환경 변수 접두사
const ENV_PREFIX: &str = "SKINSIGHT";

/// 환경 변수 섹션 구분자
const ENV_SEPARATOR: &str = "__";

/// 설정 관리자
///
/// 설정 파일의 로드/저장 및 런타임 설정 변경을 관리한다.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 현재 설정 (스레드 안전)
    config: Arc<RwLock<GuidanceConfig>>,
    /// 설정 파일 경로
    config_path: PathBuf,
    /// 환경 변수 대체 소스 (None이면 프로세스 환경 사용)
    env_override: Option<Map<String, String>>,
}

impl ConfigManager {
    /// 기본 경로로 설정 관리자 생성 및 설정 로드
    ///
    /// 설정 파일이 없으면 기본 설정을 생성하고 저장한다.
    pub fn new() -> Result<Self, CoreError> {
        let config_path = Self::config_dir()?.join(CONFIG_FILE_NAME);
        Self::with_path(config_path)
    }

    /// 지정된 경로로 설정 관리자 생성
    pub fn with_path(config_path: PathBuf) -> Result<Self, CoreError> {
        Self::build(config_path, None)
    }

    /// 프로세스 환경 대신 주어진 변수 맵을 덮어쓰기 레이어로 사용
    pub fn with_env(
        config_path: PathBuf,
        vars: Map<String, String>,
    ) -> Result<Self, CoreError> {
        Self::build(config_path, Some(vars))
    }

    fn build(
        config_path: PathBuf,
        env_override: Option<Map<String, String>>,
    ) -> Result<Self, CoreError> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CoreError::Config(format!(
                        "설정 디렉토리 생성 실패: {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
                info!("설정 디렉토리 생성: {}", parent.display());
            }
        }

        if !config_path.exists() {
            Self::save_to_file(&config_path, &GuidanceConfig::default_config())?;
            info!("기본 설정 파일 생성: {}", config_path.display());
        }

        let config = Self::load_layered(&config_path, env_override.clone())?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
            env_override,
        })
    }

    /// 현재 설정 반환 (복제본)
    pub fn get(&self) -> GuidanceConfig {
        self.config.read().clone()
    }

    /// 설정 업데이트 및 파일 저장
    pub fn update(&self, new_config: GuidanceConfig) -> Result<(), CoreError> {
        new_config.validate()?;
        Self::save_to_file(&self.config_path, &new_config)?;
        *self.config.write() = new_config;
        debug!("설정 저장 완료: {}", self.config_path.display());
        Ok(())
    }

    /// 특정 필드만 업데이트
    pub fn update_with<F>(&self, updater: F) -> Result<GuidanceConfig, CoreError>
    where
        F: FnOnce(&mut GuidanceConfig),
    {
        let mut config = self.get();
        updater(&mut config);
        self.update(config.clone())?;
        Ok(config)
    }

    /// 설정 파일 경로 반환
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 설정 다시 로드 (파일 + 환경 변수)
    pub fn reload(&self) -> Result<(), CoreError> {
        let config = Self::load_layered(&self.config_path, self.env_override.clone())?;
        *self.config.write() = config;
        info!("설정 다시 로드 완료");
        Ok(())
    }

    /// 플랫폼별 설정 디렉토리 경로
    pub fn config_dir() -> Result<PathBuf, CoreError> {
        ProjectDirs::from("com", "skinsight", "skinsight")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| CoreError::Config("홈 디렉토리를 찾을 수 없습니다".to_string()))
    }

    /// 파일 + 환경 변수 레이어 병합
    fn load_layered(
        path: &Path,
        env_override: Option<Map<String, String>>,
    ) -> Result<GuidanceConfig, CoreError> {
        let env = Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(env_override);

        let config: GuidanceConfig = config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Json))
            .add_source(env)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| {
                CoreError::Config(format!("설정 로드 실패: {}: {}", path.display(), e))
            })?;

        config.validate()?;
        debug!("설정 파일 로드 완료: {}", path.display());
        Ok(config)
    }

    /// 파일에 설정 저장
    fn save_to_file(path: &Path, config: &GuidanceConfig) -> Result<(), CoreError> {
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| CoreError::Config(format!("설정 직렬화 실패: {}", e)))?;

        fs::write(path, content).map_err(|e| {
            CoreError::Config(format!("설정 파일 저장 실패: {}: {}", path.display(), e))
        })?;

        Ok(())
    }
}
