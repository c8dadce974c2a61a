//! Namespace-qualified names of runtime types with dedicated marking rules.

/// Root of the managed type hierarchy
pub const OBJECT: &str = "System.Object";
/// Base of all value types
pub const VALUE_TYPE: &str = "System.ValueType";
/// Base of all enum types
pub const ENUM: &str = "System.Enum";
/// Base delegate type, constructed by the runtime
pub const DELEGATE: &str = "System.Delegate";
/// Base of all concrete delegate types
pub const MULTICAST_DELEGATE: &str = "System.MulticastDelegate";
/// The void return type
pub const VOID: &str = "System.Void";
/// The string type
pub const STRING: &str = "System.String";
/// The reflection type handle
pub const TYPE: &str = "System.Type";
/// Exception thrown by synthesized throwing bodies
pub const NOT_SUPPORTED_EXCEPTION: &str = "System.NotSupportedException";
/// Event tracing provider base type
pub const EVENT_SOURCE: &str = "System.Diagnostics.Tracing.EventSource";
/// Debugger display format attribute
pub const DEBUGGER_DISPLAY_ATTRIBUTE: &str = "System.Diagnostics.DebuggerDisplayAttribute";
/// Debugger proxy type attribute
pub const DEBUGGER_TYPE_PROXY_ATTRIBUTE: &str = "System.Diagnostics.DebuggerTypeProxyAttribute";
/// Marker attribute force-kept once reflection-only usage is discovered
pub const DISABLE_PRIVATE_REFLECTION_ATTRIBUTE: &str =
    "System.Runtime.CompilerServices.DisablePrivateReflectionAttribute";
/// Serialization callback attribute (before serialization)
pub const ON_SERIALIZING_ATTRIBUTE: &str = "System.Runtime.Serialization.OnSerializingAttribute";
/// Serialization callback attribute (after serialization)
pub const ON_SERIALIZED_ATTRIBUTE: &str = "System.Runtime.Serialization.OnSerializedAttribute";
/// Serialization callback attribute (before deserialization)
pub const ON_DESERIALIZING_ATTRIBUTE: &str =
    "System.Runtime.Serialization.OnDeserializingAttribute";
/// Serialization callback attribute (after deserialization)
pub const ON_DESERIALIZED_ATTRIBUTE: &str = "System.Runtime.Serialization.OnDeserializedAttribute";
/// Expression tree factory type recognized by the reflection scanner
pub const EXPRESSION: &str = "System.Linq.Expressions.Expression";
/// Method converting a runtime type handle to a `System.Type`
pub const GET_TYPE_FROM_HANDLE: &str = "GetTypeFromHandle";

/// The serialization callback attributes as a group.
pub const SERIALIZATION_CALLBACK_ATTRIBUTES: [&str; 4] = [
    ON_SERIALIZING_ATTRIBUTE,
    ON_SERIALIZED_ATTRIBUTE,
    ON_DESERIALIZING_ATTRIBUTE,
    ON_DESERIALIZED_ATTRIBUTE,
];

/// Types the runtime creates from native code with no visible managed
/// constructor call; instantiation analysis cannot see their construction.
pub const RUNTIME_INSTANTIATED_TYPES: [&str; 4] = [DELEGATE, MULTICAST_DELEGATE, VALUE_TYPE, ENUM];

/// Nested type names of an event-source provider whose static fields the
/// tracing runtime reads directly.
pub const EVENT_SOURCE_PROVIDER_GROUPS: [&str; 3] = ["Keywords", "Tasks", "Opcodes"];
