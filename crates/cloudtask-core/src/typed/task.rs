//! DeferredTask trait - payload 型と target path の対応付け

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::HttpMethod;

/// DeferredTask は payload 型と、それを受け取る endpoint を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct SendWelcomeMail {
///     user_id: u64,
/// }
///
/// impl DeferredTask for SendWelcomeMail {
///     const PATH: &'static str = "/tasks/send-welcome-mail/";
/// }
/// ```
///
/// # Trait Bounds
/// - `Serialize`: 投入時に JSON mapping にするため
/// - `DeserializeOwned`: callback の body から復元するため
/// - `Send + Sync + 'static`: Arc に格納して複数スレッドから使うため
pub trait DeferredTask: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 外部サービスが後で呼び出す相対 URL
    const PATH: &'static str;

    const METHOD: HttpMethod = HttpMethod::Post;
}
