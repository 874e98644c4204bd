//! LibXML2 FFI Wrapper Module
//!
//! Safe wrappers around the libxml2 calls the converter needs: parsing XML
//! documents from memory with line-numbered diagnostics, parsing XSD schemas,
//! and validating parsed documents against them.
//!
//! ## Why direct FFI
//!
//! No pure Rust crate performs XSD validation, and the `libxml` bindings
//! still need the system library while hiding the structured error channel.
//! Binding the handful of functions we use directly keeps full control over
//! error capture and resource management.
//!
//! ## Thread Safety
//!
//! - **Initialization** happens exactly once behind [`std::sync::Once`].
//! - **Document parsing and validation** are thread-safe as long as every
//!   thread uses its own contexts, which the wrappers guarantee.
//! - **Schema and stylesheet parsing** are NOT thread-safe and are serialized
//!   through [`parse_lock`].
//! - **Error capture** installs a structured error handler on the calling
//!   thread only, for the duration of a single call.

use std::ffi::CStr;
use std::marker::PhantomData;
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard, Once};

use libc::{c_char, c_int, c_void};

use crate::error::{LibXml2Error, LibXml2Result};

/// Global initialization flag for libxml2
///
/// libxml2's initialization functions are NOT thread-safe, so they run
/// exactly once behind this guard.
static LIBXML2_INIT: Once = Once::new();

/// Serializes schema and stylesheet parsing across threads
static PARSE_LOCK: Mutex<()> = Mutex::new(());

/// Disallow network access while resolving documents
const XML_PARSE_NONET: c_int = 1 << 11;

/// `xmlErrorLevel` values
const XML_ERR_WARNING: c_int = 1;
const XML_ERR_ERROR: c_int = 2;

/// Acquire the process-wide parse lock.
///
/// A poisoned lock only means another parse panicked; the guarded state is
/// `()`, so it is safe to keep going.
pub(crate) fn parse_lock() -> MutexGuard<'static, ()> {
    PARSE_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

// Opaque libxml2 structures
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

#[allow(non_camel_case_types)]
#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    /// Column number, when the parser knows it
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut xmlError)>;

pub type XmlFreeFunc = Option<unsafe extern "C" fn(mem: *mut c_void)>;

// External libxml2 FFI declarations
#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub fn xmlInitParser();
    pub fn xmlInitGlobals();

    /// Deallocator matching libxml2's allocator
    #[allow(non_upper_case_globals)]
    pub static xmlFree: XmlFreeFunc;

    // Error reporting
    pub fn xmlSetStructuredErrorFunc(ctx: *mut c_void, handler: XmlStructuredErrorFunc);

    // Document parsing
    pub fn xmlReadMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);

    // Schema parsing functions
    pub fn xmlSchemaNewMemParserCtxt(
        buffer: *const c_char,
        size: c_int,
    ) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaParse(ctxt: *mut XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation functions
    pub fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaValidateDoc(ctxt: *mut XmlSchemaValidCtxt, doc: *mut XmlDoc) -> c_int;
}

/// Free memory handed out by libxml2 (or libxslt)
///
/// # Safety
///
/// `mem` must be null or a pointer allocated by libxml2's allocator that is
/// not used afterwards.
pub(crate) unsafe fn free_xml_memory(mem: *mut c_void) {
    if mem.is_null() {
        return;
    }
    // Safety: reading an initialized, process-wide function pointer
    let free = unsafe { xmlFree };
    if let Some(free) = free {
        unsafe { free(mem) };
    }
}

/// One message reported by libxml2 through its structured error channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    /// 1-based line, 0 when unknown
    pub line: u64,
    /// 1-based column, 0 when unknown
    pub column: u64,
    pub level: i32,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.level >= XML_ERR_ERROR
    }

    pub fn is_warning(&self) -> bool {
        self.level == XML_ERR_WARNING
    }
}

/// Callback for libxml2 to report diagnostics (structured)
unsafe extern "C" fn collect_diagnostic(user_data: *mut c_void, error: *mut xmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }

    let diagnostics = unsafe { &mut *(user_data as *mut Vec<Diagnostic>) };
    let error = unsafe { &*error };

    let message = if error.message.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(error.message) }
            .to_string_lossy()
            .trim()
            .to_string()
    };

    diagnostics.push(Diagnostic {
        message,
        line: error.line.max(0) as u64,
        column: error.int2.max(0) as u64,
        level: error.level,
    });
}

/// Routes every libxml2 diagnostic raised on this thread into a buffer until
/// dropped, so nothing is printed to stderr.
pub(crate) struct ErrorCapture {
    diagnostics: Box<Vec<Diagnostic>>,
}

impl ErrorCapture {
    pub(crate) fn install() -> Self {
        let mut diagnostics = Box::new(Vec::new());
        unsafe {
            xmlSetStructuredErrorFunc(
                diagnostics.as_mut() as *mut Vec<Diagnostic> as *mut c_void,
                Some(collect_diagnostic),
            );
        }
        ErrorCapture { diagnostics }
    }

    /// Pointer suitable as the `ctx` argument of the per-context
    /// `*SetStructuredErrors` functions; valid while `self` lives
    pub(crate) fn user_data(&mut self) -> *mut c_void {
        self.diagnostics.as_mut() as *mut Vec<Diagnostic> as *mut c_void
    }

    pub(crate) fn finish(mut self) -> Vec<Diagnostic> {
        std::mem::take(self.diagnostics.as_mut())
    }
}

impl Drop for ErrorCapture {
    fn drop(&mut self) {
        unsafe {
            xmlSetStructuredErrorFunc(ptr::null_mut(), None);
        }
    }
}

/// Parsed XML document, freed on drop
///
/// Documents are not shared between threads; parse where you use them.
#[derive(Debug)]
pub struct XmlDocument {
    ptr: *mut XmlDoc,
}

impl XmlDocument {
    /// Take ownership of a document allocated by libxml2
    ///
    /// # Safety
    ///
    /// `ptr` must be a valid, non-null document nobody else frees.
    pub(crate) unsafe fn from_raw(ptr: *mut XmlDoc) -> Self {
        XmlDocument { ptr }
    }

    pub(crate) fn as_ptr(&self) -> *mut XmlDoc {
        self.ptr
    }
}

impl Drop for XmlDocument {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlFreeDoc(self.ptr);
            }
            self.ptr = ptr::null_mut();
        }
    }
}

/// Thread-safe wrapper for libxml2 schema pointer with proper resource management
///
/// This wrapper ensures that:
/// - Schema pointers are freed exactly once, when the last clone drops
/// - The schema can be shared across threads for validation
#[derive(Debug)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: *mut XmlSchema,
    _phantom: PhantomData<XmlSchema>,
}

// Safety: parsed xmlSchema structures are read-only during validation
unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    /// Create a new XmlSchemaPtr from a raw pointer
    ///
    /// # Safety
    ///
    /// The pointer must come from `xmlSchemaParse` and must not be freed by
    /// anyone else.
    pub(crate) unsafe fn from_raw(ptr: *mut XmlSchema) -> LibXml2Result<Self> {
        if ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed { details: None });
        }

        Ok(XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner {
                ptr,
                _phantom: PhantomData,
            }),
        })
    }

    pub(crate) fn as_ptr(&self) -> *const XmlSchema {
        self.inner.ptr
    }

    pub fn is_valid(&self) -> bool {
        !self.inner.ptr.is_null()
    }
}

impl Clone for XmlSchemaPtr {
    fn clone(&self) -> Self {
        XmlSchemaPtr {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlSchemaFree(self.ptr);
            }
            self.ptr = ptr::null_mut();
        }
    }
}

/// Verdict of validating one document against a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaVerdict {
    /// Return code 0
    Valid,
    /// Return code > 0: the document violates the schema
    Invalid {
        error_count: i32,
        errors: Vec<Diagnostic>,
    },
    /// Return code < 0, with whatever was reported before the failure
    InternalError { code: i32, errors: Vec<Diagnostic> },
}

impl SchemaVerdict {
    pub fn from_code(code: c_int, errors: Vec<Diagnostic>) -> Self {
        match code {
            0 => SchemaVerdict::Valid,
            n if n > 0 => SchemaVerdict::Invalid {
                error_count: n,
                errors,
            },
            n => SchemaVerdict::InternalError { code: n, errors },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, SchemaVerdict::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, SchemaVerdict::Invalid { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SchemaVerdict::InternalError { .. })
    }

    /// The first violation libxml2 reported, if any
    pub fn first_violation(&self) -> Option<&Diagnostic> {
        match self {
            SchemaVerdict::Valid => None,
            SchemaVerdict::Invalid { errors, .. } | SchemaVerdict::InternalError { errors, .. } => {
                errors.iter().find(|d| d.is_error())
            }
        }
    }
}

fn buffer_len(data: &[u8]) -> LibXml2Result<c_int> {
    c_int::try_from(data.len()).map_err(|_| LibXml2Error::InputTooLarge { size: data.len() })
}

/// LibXML2 wrapper providing safe access to parsing and validation
///
/// Cheap to construct; every instance shares the one-time library
/// initialization.
#[derive(Debug)]
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
            xmlInitGlobals();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Parse an XML document from memory.
    ///
    /// # Errors
    ///
    /// Returns `LibXml2Error::InvalidXml` carrying the first error libxml2
    /// reported (message and 1-based line) when the document is not
    /// well-formed, including when it is empty.
    pub fn parse_document(&self, content: &[u8]) -> LibXml2Result<XmlDocument> {
        if content.is_empty() {
            return Err(LibXml2Error::InvalidXml {
                line: 1,
                message: "Document is empty".to_string(),
            });
        }
        let size = buffer_len(content)?;

        let capture = ErrorCapture::install();
        let doc = unsafe {
            xmlReadMemory(
                content.as_ptr() as *const c_char,
                size,
                ptr::null(),
                ptr::null(),
                XML_PARSE_NONET,
            )
        };
        let diagnostics = capture.finish();

        if doc.is_null() {
            let error = match diagnostics.into_iter().find(Diagnostic::is_error) {
                Some(first) => LibXml2Error::InvalidXml {
                    line: first.line,
                    message: first.message,
                },
                None => LibXml2Error::InvalidXml {
                    line: 0,
                    message: "Failed to parse XML document".to_string(),
                },
            };
            return Err(error);
        }

        Ok(unsafe { XmlDocument::from_raw(doc) })
    }

    /// Parse an XML schema from a memory buffer.
    ///
    /// Serialized process-wide: libxml2 schema parsing is not thread-safe.
    ///
    /// # Errors
    ///
    /// Returns `LibXml2Error::SchemaParseFailed` with the first reported
    /// problem when the schema cannot be parsed, and
    /// `LibXml2Error::MemoryAllocation` if the parser context cannot be created.
    pub fn parse_schema_from_memory(&self, schema_data: &[u8]) -> LibXml2Result<XmlSchemaPtr> {
        if schema_data.iter().all(u8::is_ascii_whitespace) {
            return Err(LibXml2Error::SchemaParseFailed {
                details: Some("Schema document is empty".to_string()),
            });
        }
        let size = buffer_len(schema_data)?;

        let _guard = parse_lock();
        let mut capture = ErrorCapture::install();

        let schema_ptr = unsafe {
            let parser_ctxt = xmlSchemaNewMemParserCtxt(schema_data.as_ptr() as *const c_char, size);
            if parser_ctxt.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }

            xmlSchemaSetParserStructuredErrors(
                parser_ctxt,
                Some(collect_diagnostic),
                capture.user_data(),
            );

            let schema_ptr = xmlSchemaParse(parser_ctxt);
            xmlSchemaFreeParserCtxt(parser_ctxt);
            schema_ptr
        };
        let diagnostics = capture.finish();

        if schema_ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed {
                details: diagnostics
                    .into_iter()
                    .find(Diagnostic::is_error)
                    .map(|d| d.message),
            });
        }

        unsafe { XmlSchemaPtr::from_raw(schema_ptr) }
    }

    /// Validate a parsed document against a schema
    ///
    /// Safe to call concurrently: each call creates its own validation
    /// context and only reads the shared schema.
    pub fn validate_document(
        &self,
        schema: &XmlSchemaPtr,
        document: &XmlDocument,
    ) -> LibXml2Result<SchemaVerdict> {
        unsafe {
            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(LibXml2Error::ValidationContextCreationFailed);
            }

            let mut errors: Vec<Diagnostic> = Vec::new();
            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(collect_diagnostic),
                &mut errors as *mut Vec<Diagnostic> as *mut c_void,
            );

            let result_code = xmlSchemaValidateDoc(valid_ctxt, document.as_ptr());
            xmlSchemaFreeValidCtxt(valid_ctxt);

            Ok(SchemaVerdict::from_code(result_code, errors))
        }
    }

    /// Parse `content` and validate it against `schema` in one step
    pub fn validate_memory(
        &self,
        schema: &XmlSchemaPtr,
        content: &[u8],
    ) -> LibXml2Result<SchemaVerdict> {
        let document = self.parse_document(content)?;
        self.validate_document(schema, &document)
    }
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}
