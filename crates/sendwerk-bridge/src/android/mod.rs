// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android telephony bridge via JNI.
//
// Requires the Android NDK and targets `aarch64-linux-android` or
// `armv7-linux-androideabi`. Each trait method calls into `SmsManager`,
// `SubscriptionManager` and the hosting Activity through the ART runtime.
//
// ## Acknowledgments
//
// `SmsManager` reports the "sent" result by firing a `PendingIntent`
// broadcast. Each send gets its own action string
// (`SENDWERK_SMS_SENT_<token>`) and its own receiver instance of the Java
// glue class below, registered for exactly that action:
//
// ```java
// package com.hyperpolymath.sendwerk;
//
// public final class AckReceiver extends android.content.BroadcastReceiver {
//     @Override
//     public void onReceive(android.content.Context ctx, android.content.Intent intent) {
//         nativeOnAck(intent.getAction(), getResultCode());
//     }
//     private static native void nativeOnAck(String action, int resultCode);
// }
// ```
//
// `nativeOnAck` lands in `Java_com_hyperpolymath_sendwerk_AckReceiver_nativeOnAck`
// which resolves the waiting send through the process-wide sink registry.
//
// Delivery-report intents are attached to submissions but no receiver is
// ever registered for them, so delivery broadcasts go unobserved.
//
// ## Local references
//
// Threads attached here stay attached for the life of the process and never
// return into Java, so nothing frees their local references implicitly.
// Every JNI operation body runs inside `local_frame`.

#![cfg(target_os = "android")]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::sys::jint;
use jni::{JNIEnv, JavaVM};
use tracing::{debug, info, warn};

use sendwerk_core::error::{Result, SendwerkError};
use sendwerk_core::types::{Channel, ChannelId, CorrelationToken, Permission};

use crate::ack::{AckRegistry, AckSink, InMemoryAckRegistry};
use crate::traits::{NativePermissions, NativeSms, NativeSubscriptions, PlatformBridge, Submission};

// ---------------------------------------------------------------------------
// Platform constants
// ---------------------------------------------------------------------------

/// Binary name of the Java receiver glue class.
const ACK_RECEIVER_CLASS: &str = "com.hyperpolymath.sendwerk.AckReceiver";

/// `PackageManager.PERMISSION_GRANTED`.
const PERMISSION_GRANTED: jint = 0;

/// `SubscriptionManager.INVALID_SUBSCRIPTION_ID`.
const INVALID_SUBSCRIPTION_ID: i32 = -1;

/// `PendingIntent.FLAG_UPDATE_CURRENT`.
const FLAG_UPDATE_CURRENT: jint = 0x0800_0000;

/// `PendingIntent.FLAG_IMMUTABLE` (API 23+).
const FLAG_IMMUTABLE: jint = 0x0400_0000;

/// `Context.RECEIVER_NOT_EXPORTED` (API 33+).
const RECEIVER_NOT_EXPORTED: jint = 0x4;

/// `Context.TELEPHONY_SUBSCRIPTION_SERVICE`.
const SUBSCRIPTION_SERVICE: &str = "telephony_subscription_service";

// ---------------------------------------------------------------------------
// Environment profile
// ---------------------------------------------------------------------------

/// API-level capabilities, resolved once when the bridge is built so call
/// sites never branch on `SDK_INT` themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdkProfile {
    pub sdk_int: i32,
}

impl SdkProfile {
    const LOLLIPOP_MR1: i32 = 22;
    const M: i32 = 23;
    const S: i32 = 31;
    const TIRAMISU: i32 = 33;

    /// Read `Build.VERSION.SDK_INT`. Falls back to the oldest supported
    /// profile when the VM cannot be reached.
    pub fn detect() -> Self {
        match read_sdk_int() {
            Ok(sdk_int) => Self { sdk_int },
            Err(e) => {
                warn!(error = %e, "could not read SDK_INT — assuming legacy profile");
                Self { sdk_int: Self::LOLLIPOP_MR1 - 1 }
            }
        }
    }

    /// Per-subscription `SmsManager` and `SubscriptionManager` exist.
    pub fn has_subscriptions(&self) -> bool {
        self.sdk_int >= Self::LOLLIPOP_MR1
    }

    /// Permissions are granted at runtime rather than at install.
    pub fn runtime_permissions(&self) -> bool {
        self.sdk_int >= Self::M
    }

    pub fn immutable_pending_intents(&self) -> bool {
        self.sdk_int >= Self::M
    }

    /// `SmsManager.getDefault()` is deprecated in favour of the system service.
    pub fn system_service_sms_manager(&self) -> bool {
        self.sdk_int >= Self::S
    }

    /// `registerReceiver` wants an explicit export flag.
    pub fn receiver_export_flag(&self) -> bool {
        self.sdk_int >= Self::TIRAMISU
    }
}


fn read_sdk_int() -> Result<i32> {
    let mut env = jni_env()?;
    local_frame(&mut env, 4, |env| {
        env.get_static_field("android/os/Build$VERSION", "SDK_INT", "I")
            .map_err(|e| bridge_err(env, "Build.VERSION.SDK_INT", e))?
            .i()
            .map_err(|e| bridge_err(env, "SDK_INT->i", e))
    })
}

// ---------------------------------------------------------------------------
// JNI bootstrap helpers
// ---------------------------------------------------------------------------

static JAVA_VM: OnceLock<JavaVM> = OnceLock::new();

/// Process-wide sink registry that `nativeOnAck` delivers into.
static ACK_SINKS: OnceLock<Arc<InMemoryAckRegistry>> = OnceLock::new();

/// Local reference slots reserved for one bridge operation.
const FRAME_CAPACITY: i32 = 32;

fn ack_sinks() -> &'static Arc<InMemoryAckRegistry> {
    ACK_SINKS.get_or_init(|| Arc::new(InMemoryAckRegistry::new()))
}

fn java_vm() -> Result<&'static JavaVM> {
    if let Some(vm) = JAVA_VM.get() {
        return Ok(vm);
    }
    let ctx = ndk_context::android_context();
    // SAFETY: `ctx.vm()` returns the `JavaVM*` set by the NDK glue code and
    // stays valid for the lifetime of the process.
    let vm = unsafe { JavaVM::from_raw(ctx.vm().cast()) }
        .map_err(|e| SendwerkError::Bridge(format!("failed to obtain JavaVM: {e}")))?;
    Ok(JAVA_VM.get_or_init(|| vm))
}

/// Attach the current thread (once) and return its [`JNIEnv`].
fn jni_env() -> Result<JNIEnv<'static>> {
    java_vm()?
        .attach_current_thread_permanently()
        .map_err(|e| SendwerkError::Bridge(format!("failed to attach JNI thread: {e}")))
}

/// Run `f` between `PushLocalFrame` and `PopLocalFrame`. Every local
/// reference `f` creates is released when it returns, on both the `Ok` and
/// the `Err` path.
fn local_frame<T>(
    env: &mut JNIEnv<'_>,
    capacity: i32,
    f: impl FnOnce(&mut JNIEnv<'_>) -> Result<T>,
) -> Result<T> {
    env.with_local_frame(capacity, |env| Ok::<_, jni::errors::Error>(f(env)))
        .map_err(|e| bridge_err(env, "local frame", e))?
}

/// The hosting `Activity` as a [`JObject`].
fn activity() -> Result<JObject<'static>> {
    let ptr = ndk_context::android_context().context();
    if ptr.is_null() {
        return Err(SendwerkError::Bridge(
            "Android context is null — native activity not initialised".into(),
        ));
    }
    // SAFETY: the NDK guarantees this pointer is a valid global jobject for
    // the hosting Activity.
    Ok(unsafe { JObject::from_raw(ptr.cast()) })
}

/// Clear any pending Java exception so the thread can keep calling into
/// the VM.
fn clear_pending_exception(env: &mut JNIEnv<'_>) {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
    }
}

fn bridge_err(env: &mut JNIEnv<'_>, context: &str, e: jni::errors::Error) -> SendwerkError {
    clear_pending_exception(env);
    SendwerkError::Bridge(format!("{context}: {e}"))
}

/// Probe failures (typically `SecurityException`) are swallowed by the
/// channel selector.
fn probe_err(env: &mut JNIEnv<'_>, context: &str, e: jni::errors::Error) -> SendwerkError {
    clear_pending_exception(env);
    SendwerkError::ChannelProbe(format!("{context}: {e}"))
}

fn submit_err(env: &mut JNIEnv<'_>, context: &str, e: jni::errors::Error) -> SendwerkError {
    clear_pending_exception(env);
    SendwerkError::Submission(format!("{context}: {e}"))
}

/// Load an app class through the Activity's class loader. `FindClass` on a
/// natively attached thread only sees the system loader.
fn load_app_class<'local>(
    env: &mut JNIEnv<'local>,
    activity: &JObject<'_>,
    binary_name: &str,
) -> Result<JClass<'local>> {
    let loader = env
        .call_method(activity, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])
        .map_err(|e| bridge_err(env, "getClassLoader", e))?
        .l()
        .map_err(|e| bridge_err(env, "getClassLoader->l", e))?;
    let j_name = env
        .new_string(binary_name)
        .map_err(|e| bridge_err(env, "new_string(class name)", e))?;
    let class = env
        .call_method(
            &loader,
            "loadClass",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            &[JValue::Object(&j_name)],
        )
        .map_err(|e| bridge_err(env, "ClassLoader.loadClass", e))?
        .l()
        .map_err(|e| bridge_err(env, "loadClass->l", e))?;
    Ok(JClass::from(class))
}

fn java_string(env: &mut JNIEnv<'_>, obj: JObject<'_>) -> Result<String> {
    let j_str = JString::from(obj);
    let value = env
        .get_string(&j_str)
        .map_err(|e| bridge_err(env, "get_string", e))?;
    Ok(value.into())
}

// ---------------------------------------------------------------------------
// Bridge struct
// ---------------------------------------------------------------------------

/// Android implementation of the Sendwerk telephony bridge.
pub struct AndroidBridge {
    profile: SdkProfile,
    platform_name: String,
}

impl AndroidBridge {
    /// Create a new Android bridge and resolve its [`SdkProfile`].
    pub fn new() -> Self {
        let profile = SdkProfile::detect();
        info!(sdk = profile.sdk_int, "Android telephony bridge ready");
        Self {
            profile,
            platform_name: format!("Android (API {})", profile.sdk_int),
        }
    }

    pub fn profile(&self) -> SdkProfile {
        self.profile
    }

    fn check_permission(&self, permission: Permission) -> Result<bool> {
        let mut env = jni_env()?;
        let activity = activity()?;

        local_frame(&mut env, 4, |env| {
            let j_name = env
                .new_string(permission.android_name())
                .map_err(|e| bridge_err(env, "new_string(permission)", e))?;
            let status = env
                .call_method(
                    &activity,
                    "checkSelfPermission",
                    "(Ljava/lang/String;)I",
                    &[JValue::Object(&j_name)],
                )
                .map_err(|e| bridge_err(env, "checkSelfPermission", e))?
                .i()
                .map_err(|e| bridge_err(env, "checkSelfPermission->i", e))?;
            Ok(status == PERMISSION_GRANTED)
        })
    }

    /// Resolve the `SmsManager` instance for `channel`.
    fn sms_manager<'local>(
        &self,
        env: &mut JNIEnv<'local>,
        activity: &JObject<'_>,
        channel: &Channel,
    ) -> Result<JObject<'local>> {
        match channel.id {
            ChannelId::Subscription(id) if self.profile.has_subscriptions() => env
                .call_static_method(
                    "android/telephony/SmsManager",
                    "getSmsManagerForSubscriptionId",
                    "(I)Landroid/telephony/SmsManager;",
                    &[JValue::Int(id)],
                )
                .map_err(|e| submit_err(env, "getSmsManagerForSubscriptionId", e))?
                .l()
                .map_err(|e| submit_err(env, "getSmsManagerForSubscriptionId->l", e)),
            _ if self.profile.system_service_sms_manager() => {
                let class = env
                    .find_class("android/telephony/SmsManager")
                    .map_err(|e| submit_err(env, "find_class(SmsManager)", e))?;
                env.call_method(
                    activity,
                    "getSystemService",
                    "(Ljava/lang/Class;)Ljava/lang/Object;",
                    &[JValue::Object(&class)],
                )
                .map_err(|e| submit_err(env, "getSystemService(SmsManager)", e))?
                .l()
                .map_err(|e| submit_err(env, "getSystemService->l", e))
            }
            _ => env
                .call_static_method(
                    "android/telephony/SmsManager",
                    "getDefault",
                    "()Landroid/telephony/SmsManager;",
                    &[],
                )
                .map_err(|e| submit_err(env, "SmsManager.getDefault", e))?
                .l()
                .map_err(|e| submit_err(env, "getDefault->l", e)),
        }
    }

    /// `PendingIntent.getBroadcast` for an app-private action.
    fn pending_broadcast<'local>(
        &self,
        env: &mut JNIEnv<'local>,
        activity: &JObject<'_>,
        action: &str,
    ) -> Result<JObject<'local>> {
        let j_action = env
            .new_string(action)
            .map_err(|e| submit_err(env, "new_string(action)", e))?;
        let intent = env
            .new_object(
                "android/content/Intent",
                "(Ljava/lang/String;)V",
                &[JValue::Object(&j_action)],
            )
            .map_err(|e| submit_err(env, "new Intent", e))?;

        let package = env
            .call_method(activity, "getPackageName", "()Ljava/lang/String;", &[])
            .map_err(|e| submit_err(env, "getPackageName", e))?
            .l()
            .map_err(|e| submit_err(env, "getPackageName->l", e))?;
        env.call_method(
            &intent,
            "setPackage",
            "(Ljava/lang/String;)Landroid/content/Intent;",
            &[JValue::Object(&package)],
        )
        .map_err(|e| submit_err(env, "Intent.setPackage", e))?;

        let flags = if self.profile.immutable_pending_intents() {
            FLAG_UPDATE_CURRENT | FLAG_IMMUTABLE
        } else {
            FLAG_UPDATE_CURRENT
        };

        env.call_static_method(
            "android/app/PendingIntent",
            "getBroadcast",
            "(Landroid/content/Context;ILandroid/content/Intent;I)Landroid/app/PendingIntent;",
            &[
                JValue::Object(activity),
                JValue::Int(0),
                JValue::Object(&intent),
                JValue::Int(flags),
            ],
        )
        .map_err(|e| submit_err(env, "PendingIntent.getBroadcast", e))?
        .l()
        .map_err(|e| submit_err(env, "getBroadcast->l", e))
    }
}

impl Default for AndroidBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBridge for AndroidBridge {
    fn platform_name(&self) -> &str {
        &self.platform_name
    }
}

// ---------------------------------------------------------------------------
// NativePermissions — Activity.checkSelfPermission
// ---------------------------------------------------------------------------

impl NativePermissions for AndroidBridge {
    fn has_permission(&self, permission: Permission) -> bool {
        // Pre-M grants everything in the manifest at install time.
        if !self.profile.runtime_permissions() {
            return true;
        }
        match self.check_permission(permission) {
            Ok(granted) => granted,
            Err(e) => {
                warn!(
                    permission = permission.manifest_name(),
                    error = %e,
                    "permission check failed — treating as not granted"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// NativeSubscriptions — SubscriptionManager
// ---------------------------------------------------------------------------

impl NativeSubscriptions for AndroidBridge {
    fn default_sms_subscription_id(&self) -> Result<i32> {
        if !self.profile.has_subscriptions() {
            return Ok(INVALID_SUBSCRIPTION_ID);
        }
        let mut env = jni_env()?;
        local_frame(&mut env, 4, |env| {
            env.call_static_method(
                "android/telephony/SubscriptionManager",
                "getDefaultSmsSubscriptionId",
                "()I",
                &[],
            )
            .map_err(|e| probe_err(env, "getDefaultSmsSubscriptionId", e))?
            .i()
            .map_err(|e| probe_err(env, "getDefaultSmsSubscriptionId->i", e))
        })
    }

    /// Enumerate `getActiveSubscriptionInfoList()`. A `SecurityException`
    /// (missing READ_PHONE_STATE) surfaces as `ChannelProbe`.
    fn active_subscriptions(&self) -> Result<Vec<Channel>> {
        if !self.profile.has_subscriptions() {
            return Ok(Vec::new());
        }
        let default_id = self
            .default_sms_subscription_id()
            .unwrap_or(INVALID_SUBSCRIPTION_ID);

        let mut env = jni_env()?;
        let activity = activity()?;

        local_frame(&mut env, FRAME_CAPACITY, |env| {
            let j_service = env
                .new_string(SUBSCRIPTION_SERVICE)
                .map_err(|e| probe_err(env, "new_string(service)", e))?;
            let manager = env
                .call_method(
                    &activity,
                    "getSystemService",
                    "(Ljava/lang/String;)Ljava/lang/Object;",
                    &[JValue::Object(&j_service)],
                )
                .map_err(|e| probe_err(env, "getSystemService(subscriptions)", e))?
                .l()
                .map_err(|e| probe_err(env, "getSystemService->l", e))?;
            if manager.is_null() {
                return Err(SendwerkError::ChannelProbe(
                    "SubscriptionManager unavailable".into(),
                ));
            }

            let list = env
                .call_method(&manager, "getActiveSubscriptionInfoList", "()Ljava/util/List;", &[])
                .map_err(|e| probe_err(env, "getActiveSubscriptionInfoList", e))?
                .l()
                .map_err(|e| probe_err(env, "getActiveSubscriptionInfoList->l", e))?;
            if list.is_null() {
                return Ok(Vec::new());
            }

            let size = env
                .call_method(&list, "size", "()I", &[])
                .map_err(|e| probe_err(env, "List.size", e))?
                .i()
                .map_err(|e| probe_err(env, "List.size->i", e))?;

            let mut channels = Vec::with_capacity(size.max(0) as usize);
            for index in 0..size {
                let (id, label) =
                    local_frame(env, 8, |env| read_subscription(env, &list, index))?;
                channels.push(Channel::subscription(id, label, id == default_id));
            }

            debug!(count = channels.len(), "active subscriptions enumerated");
            Ok(channels)
        })
    }
}

/// Id and display label of the `SubscriptionInfo` at `index`.
fn read_subscription(env: &mut JNIEnv<'_>, list: &JObject<'_>, index: jint) -> Result<(i32, String)> {
    let info = env
        .call_method(list, "get", "(I)Ljava/lang/Object;", &[JValue::Int(index)])
        .map_err(|e| probe_err(env, "List.get", e))?
        .l()
        .map_err(|e| probe_err(env, "List.get->l", e))?;

    let id = env
        .call_method(&info, "getSubscriptionId", "()I", &[])
        .map_err(|e| probe_err(env, "getSubscriptionId", e))?
        .i()
        .map_err(|e| probe_err(env, "getSubscriptionId->i", e))?;

    let display_name = env
        .call_method(&info, "getDisplayName", "()Ljava/lang/CharSequence;", &[])
        .map_err(|e| probe_err(env, "getDisplayName", e))?
        .l()
        .map_err(|e| probe_err(env, "getDisplayName->l", e))?;

    if display_name.is_null() {
        return Ok((id, format!("subscription {id}")));
    }
    let as_string = env
        .call_method(&display_name, "toString", "()Ljava/lang/String;", &[])
        .map_err(|e| probe_err(env, "CharSequence.toString", e))?
        .l()
        .map_err(|e| probe_err(env, "toString->l", e))?;
    Ok((id, java_string(env, as_string)?))
}

// ---------------------------------------------------------------------------
// NativeSms — SmsManager.sendTextMessage / sendMultipartTextMessage
// ---------------------------------------------------------------------------

impl NativeSms for AndroidBridge {
    fn submit(&self, submission: &Submission<'_>) -> Result<()> {
        let first_segment = submission.first_segment()?;

        let mut env = jni_env()?;
        let activity = activity()?;

        local_frame(&mut env, FRAME_CAPACITY, |env| {
            let manager = self.sms_manager(env, &activity, submission.channel)?;
            if manager.is_null() {
                return Err(SendwerkError::Submission("SmsManager unavailable".into()));
            }

            let sent_pi =
                self.pending_broadcast(env, &activity, &submission.sent_token.sent_action())?;
            let delivered_pi = match submission.delivery_token {
                Some(token) => self.pending_broadcast(env, &activity, &token.delivered_action())?,
                None => JObject::null(),
            };

            let j_dest = env
                .new_string(submission.recipient)
                .map_err(|e| submit_err(env, "new_string(recipient)", e))?;
            let no_service_centre = JObject::null();

            if submission.is_multipart() {
                // Let the platform size the parts: concatenated PDUs lose
                // room to the UDH, so they are shorter than the segments.
                let j_body = env
                    .new_string(submission.body())
                    .map_err(|e| submit_err(env, "new_string(body)", e))?;
                let parts = env
                    .call_method(
                        &manager,
                        "divideMessage",
                        "(Ljava/lang/String;)Ljava/util/ArrayList;",
                        &[JValue::Object(&j_body)],
                    )
                    .map_err(|e| submit_err(env, "divideMessage", e))?
                    .l()
                    .map_err(|e| submit_err(env, "divideMessage->l", e))?;
                let part_count = env
                    .call_method(&parts, "size", "()I", &[])
                    .map_err(|e| submit_err(env, "ArrayList.size", e))?
                    .i()
                    .map_err(|e| submit_err(env, "ArrayList.size->i", e))?;

                info!(
                    parts = part_count,
                    segments = submission.segments.len(),
                    channel = %submission.channel.label,
                    "Android: sending multipart SMS"
                );

                let sent_intents = new_array_list(env)?;
                let delivered_intents = new_array_list(env)?;
                for _ in 0..part_count {
                    // Every part carries the same sent intent; the first
                    // result to arrive resolves the send.
                    array_list_add(env, &sent_intents, &sent_pi)?;
                    array_list_add(env, &delivered_intents, &delivered_pi)?;
                }

                env.call_method(
                    &manager,
                    "sendMultipartTextMessage",
                    "(Ljava/lang/String;Ljava/lang/String;Ljava/util/ArrayList;Ljava/util/ArrayList;Ljava/util/ArrayList;)V",
                    &[
                        JValue::Object(&j_dest),
                        JValue::Object(&no_service_centre),
                        JValue::Object(&parts),
                        JValue::Object(&sent_intents),
                        JValue::Object(&delivered_intents),
                    ],
                )
                .map_err(|e| submit_err(env, "sendMultipartTextMessage", e))?;
            } else {
                info!(channel = %submission.channel.label, "Android: sending single SMS");

                let j_text = env
                    .new_string(first_segment)
                    .map_err(|e| submit_err(env, "new_string(text)", e))?;
                env.call_method(
                    &manager,
                    "sendTextMessage",
                    "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;Landroid/app/PendingIntent;Landroid/app/PendingIntent;)V",
                    &[
                        JValue::Object(&j_dest),
                        JValue::Object(&no_service_centre),
                        JValue::Object(&j_text),
                        JValue::Object(&sent_pi),
                        JValue::Object(&delivered_pi),
                    ],
                )
                .map_err(|e| submit_err(env, "sendTextMessage", e))?;
            }

            Ok(())
        })
    }
}

fn new_array_list<'local>(env: &mut JNIEnv<'local>) -> Result<JObject<'local>> {
    env.new_object("java/util/ArrayList", "()V", &[])
        .map_err(|e| submit_err(env, "new ArrayList", e))
}

fn array_list_add(env: &mut JNIEnv<'_>, list: &JObject<'_>, item: &JObject<'_>) -> Result<()> {
    env.call_method(list, "add", "(Ljava/lang/Object;)Z", &[JValue::Object(item)])
        .map_err(|e| submit_err(env, "ArrayList.add", e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Broadcast-backed acknowledgment registry
// ---------------------------------------------------------------------------

/// Registers one `AckReceiver` per correlation token with the Activity and
/// keeps the matching sink in the process-wide registry.
pub struct BroadcastAckRegistry {
    profile: SdkProfile,
    sinks: Arc<InMemoryAckRegistry>,
    receivers: Mutex<HashMap<CorrelationToken, GlobalRef>>,
}

impl BroadcastAckRegistry {
    pub fn new(profile: SdkProfile) -> Self {
        Self {
            profile,
            sinks: Arc::clone(ack_sinks()),
            receivers: Mutex::new(HashMap::new()),
        }
    }

    fn register_receiver(&self, token: &CorrelationToken) -> Result<GlobalRef> {
        let mut env = jni_env()?;
        let activity = activity()?;

        local_frame(&mut env, 8, |env| {
            let class = load_app_class(env, &activity, ACK_RECEIVER_CLASS)?;
            let receiver = env
                .new_object(&class, "()V", &[])
                .map_err(|e| bridge_err(env, "new AckReceiver", e))?;

            let j_action = env
                .new_string(token.sent_action())
                .map_err(|e| bridge_err(env, "new_string(action)", e))?;
            let filter = env
                .new_object(
                    "android/content/IntentFilter",
                    "(Ljava/lang/String;)V",
                    &[JValue::Object(&j_action)],
                )
                .map_err(|e| bridge_err(env, "new IntentFilter", e))?;

            if self.profile.receiver_export_flag() {
                env.call_method(
                    &activity,
                    "registerReceiver",
                    "(Landroid/content/BroadcastReceiver;Landroid/content/IntentFilter;I)Landroid/content/Intent;",
                    &[
                        JValue::Object(&receiver),
                        JValue::Object(&filter),
                        JValue::Int(RECEIVER_NOT_EXPORTED),
                    ],
                )
                .map_err(|e| bridge_err(env, "registerReceiver(flags)", e))?;
            } else {
                env.call_method(
                    &activity,
                    "registerReceiver",
                    "(Landroid/content/BroadcastReceiver;Landroid/content/IntentFilter;)Landroid/content/Intent;",
                    &[JValue::Object(&receiver), JValue::Object(&filter)],
                )
                .map_err(|e| bridge_err(env, "registerReceiver", e))?;
            }

            // The global ref outlives the frame; the receiver must stay
            // reachable until `unregister`.
            env.new_global_ref(&receiver)
                .map_err(|e| bridge_err(env, "new_global_ref(receiver)", e))
        })
    }

    fn unregister_receiver(&self, receiver: &GlobalRef) -> Result<()> {
        let mut env = jni_env()?;
        let activity = activity()?;
        local_frame(&mut env, 4, |env| {
            env.call_method(
                &activity,
                "unregisterReceiver",
                "(Landroid/content/BroadcastReceiver;)V",
                &[JValue::Object(receiver.as_obj())],
            )
            .map_err(|e| bridge_err(env, "unregisterReceiver", e))?;
            Ok(())
        })
    }
}

impl AckRegistry for BroadcastAckRegistry {
    fn register(&self, token: CorrelationToken, sink: AckSink) -> Result<()> {
        self.sinks.register(token, sink)?;
        match self.register_receiver(&token) {
            Ok(receiver) => {
                self.receivers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(token, receiver);
                Ok(())
            }
            Err(e) => {
                self.sinks.unregister(&token);
                Err(e)
            }
        }
    }

    fn unregister(&self, token: &CorrelationToken) -> bool {
        let receiver = self
            .receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
        if let Some(receiver) = receiver {
            if let Err(e) = self.unregister_receiver(&receiver) {
                warn!(%token, error = %e, "unregisterReceiver failed");
            }
        }
        self.sinks.unregister(token)
    }
}

/// Entry point for `AckReceiver.nativeOnAck(String, int)`. Only "sent"
/// actions have a registered receiver.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_hyperpolymath_sendwerk_AckReceiver_nativeOnAck(
    mut env: JNIEnv<'_>,
    _class: JClass<'_>,
    action: JString<'_>,
    result_code: jint,
) {
    let action: String = match env.get_string(&action) {
        Ok(value) => value.into(),
        Err(e) => {
            warn!(error = %e, "nativeOnAck: unreadable action");
            return;
        }
    };

    let Some(token) = CorrelationToken::from_action(&action) else {
        warn!(action = %action, "nativeOnAck: action carries no correlation token");
        return;
    };

    ack_sinks().deliver(&token, result_code);
}
