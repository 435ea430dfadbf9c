//! Bridge configuration.

/// `JNI_VERSION_1_6`.
pub const JNI_VERSION_1_6: i32 = 0x0001_0006;

/// Process-wide settings, fixed at initialisation.
///
/// ```
/// use safejni::BridgeConfig;
///
/// let config = BridgeConfig::new()
///     .with_method_cache(false)
///     .with_exception_describe(true);
/// assert!(!config.cache_method_handles());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    cache_method_handles: bool,
    describe_exceptions: bool,
    jni_version: i32,
}

impl BridgeConfig {
    pub const fn new() -> Self {
        Self {
            cache_method_handles: true,
            describe_exceptions: false,
            jni_version: JNI_VERSION_1_6,
        }
    }

    /// Keep resolved method handles for the life of the process.
    pub const fn with_method_cache(mut self, enabled: bool) -> Self {
        self.cache_method_handles = enabled;
        self
    }

    /// Print pending exceptions through `ExceptionDescribe` before they are
    /// converted into errors.
    pub const fn with_exception_describe(mut self, enabled: bool) -> Self {
        self.describe_exceptions = enabled;
        self
    }

    /// JNI version requested from `GetEnv` and returned from `JNI_OnLoad`.
    pub const fn with_jni_version(mut self, version: i32) -> Self {
        self.jni_version = version;
        self
    }

    pub const fn cache_method_handles(&self) -> bool {
        self.cache_method_handles
    }

    pub const fn describe_exceptions(&self) -> bool {
        self.describe_exceptions
    }

    pub const fn jni_version(&self) -> i32 {
        self.jni_version
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}
