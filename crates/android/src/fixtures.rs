//! Manifest fixtures shared by unit tests

pub(crate) const BIOMEDICAL: &str = r#"
[app]
application_id = "com.example.biomedical"
version_code = 17
version_name = "1.4.1"

[sdk]
min = 24
target = 36
compile = 36
ndk = "27.0.12077973"

[compile_options]
java_version = 11
core_library_desugaring = true

[build_types.release]
proguard_files = ["proguard-android-optimize.txt", "proguard-rules.pro"]

[dependencies]
implementation = [
    "androidx.core:core-ktx:1.16.0",
    { coordinate = "com.google.firebase:firebase-bom", version = "34.0.0", platform = true },
    "com.google.firebase:firebase-analytics",
]
core_library_desugaring = ["com.android.tools:desugar_jdk_libs:2.1.5"]
"#;

pub(crate) const KEY_PROPERTIES: &str = "\
storeFile=upload-keystore.jks
storePassword=hunter2#1
keyAlias=upload
keyPassword=hunter2#1
";
