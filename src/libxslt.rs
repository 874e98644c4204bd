//! LibXSLT FFI Wrapper Module
//!
//! Compiles XSLT stylesheets and applies them to documents parsed by
//! [`LibXml2Wrapper`], serializing the result with the stylesheet's own
//! `xsl:output` settings.
//!
//! Stylesheet compilation shares the libxml2 parse lock; applying a compiled
//! stylesheet to different documents is safe from multiple threads.

use std::ffi::CString;
use std::path::Path;
use std::ptr;
use std::sync::Once;

use libc::{c_char, c_int, c_uchar, c_void};

use crate::error::{LibXml2Error, LibXml2Result};
use crate::libxml2::{
    Diagnostic, ErrorCapture, LibXml2Wrapper, XmlDoc, XmlDocument, free_xml_memory, parse_lock,
};

static LIBXSLT_INIT: Once = Once::new();

#[repr(C)]
pub struct XsltStylesheet {
    _private: [u8; 0],
}

#[cfg_attr(target_os = "windows", link(name = "libxslt"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xslt"))]
unsafe extern "C" {
    pub fn xsltInit();

    pub fn xsltParseStylesheetFile(filename: *const c_uchar) -> *mut XsltStylesheet;
    pub fn xsltFreeStylesheet(style: *mut XsltStylesheet);

    pub fn xsltApplyStylesheet(
        style: *mut XsltStylesheet,
        doc: *mut XmlDoc,
        params: *mut *const c_char,
    ) -> *mut XmlDoc;

    pub fn xsltSaveResultToString(
        doc_txt_ptr: *mut *mut c_uchar,
        doc_txt_len: *mut c_int,
        result: *mut XmlDoc,
        style: *mut XsltStylesheet,
    ) -> c_int;
}

/// Compiled stylesheet, freed on drop
#[derive(Debug)]
pub struct Stylesheet {
    ptr: *mut XsltStylesheet,
}

impl Drop for Stylesheet {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xsltFreeStylesheet(self.ptr);
            }
            self.ptr = ptr::null_mut();
        }
    }
}

/// Entry point for XSLT work
#[derive(Debug)]
pub struct LibXsltWrapper {
    libxml2: LibXml2Wrapper,
}

impl LibXsltWrapper {
    pub fn new() -> Self {
        let libxml2 = LibXml2Wrapper::new();
        LIBXSLT_INIT.call_once(|| unsafe {
            xsltInit();
        });
        LibXsltWrapper { libxml2 }
    }

    /// The libxml2 wrapper used to parse source documents
    pub fn libxml2(&self) -> &LibXml2Wrapper {
        &self.libxml2
    }

    /// Parse and compile a stylesheet from disk.
    ///
    /// # Errors
    ///
    /// Returns `LibXml2Error::StylesheetParseFailed` when the file cannot be
    /// read, is not well-formed, or is not a valid stylesheet.
    pub fn parse_stylesheet_file(&self, path: &Path) -> LibXml2Result<Stylesheet> {
        let parse_failed = |details: Option<String>| LibXml2Error::StylesheetParseFailed {
            path: path.to_path_buf(),
            details,
        };
        let c_path = path
            .to_str()
            .and_then(|p| CString::new(p).ok())
            .ok_or_else(|| parse_failed(Some("path cannot be passed to libxslt".to_string())))?;

        let _guard = parse_lock();
        let capture = ErrorCapture::install();
        let stylesheet = unsafe { xsltParseStylesheetFile(c_path.as_ptr() as *const c_uchar) };
        let diagnostics = capture.finish();

        if stylesheet.is_null() {
            // XSLT compile errors bypass the structured handler, so details may be absent
            let details = diagnostics
                .into_iter()
                .find(Diagnostic::is_error)
                .map(|d| d.message);
            return Err(parse_failed(details));
        }
        Ok(Stylesheet { ptr: stylesheet })
    }

    /// Apply `stylesheet` to `document` and serialize the result as text
    pub fn apply_to_string(
        &self,
        stylesheet: &Stylesheet,
        document: &XmlDocument,
    ) -> LibXml2Result<String> {
        let capture = ErrorCapture::install();
        let result = unsafe { xsltApplyStylesheet(stylesheet.ptr, document.as_ptr(), ptr::null_mut()) };
        let diagnostics = capture.finish();

        if result.is_null() {
            let details = diagnostics
                .into_iter()
                .find(|d| d.is_error())
                .map(|d| d.message)
                .unwrap_or_else(|| "stylesheet produced no result document".to_string());
            return Err(LibXml2Error::TransformFailed { details });
        }
        let result = unsafe { XmlDocument::from_raw(result) };

        let mut buffer: *mut c_uchar = ptr::null_mut();
        let mut length: c_int = 0;
        let code = unsafe {
            xsltSaveResultToString(&mut buffer, &mut length, result.as_ptr(), stylesheet.ptr)
        };

        if code != 0 {
            unsafe { free_xml_memory(buffer as *mut c_void) };
            return Err(LibXml2Error::TransformFailed {
                details: format!("result serialization failed with code {code}"),
            });
        }
        if buffer.is_null() || length <= 0 {
            unsafe { free_xml_memory(buffer as *mut c_void) };
            return Ok(String::new());
        }

        let text = unsafe {
            let bytes = std::slice::from_raw_parts(buffer, length as usize);
            String::from_utf8_lossy(bytes).into_owned()
        };
        unsafe { free_xml_memory(buffer as *mut c_void) };

        Ok(text)
    }

    /// Parse `xml`, then apply the stylesheet at `stylesheet_path` to it
    pub fn transform_memory(&self, xml: &[u8], stylesheet_path: &Path) -> LibXml2Result<String> {
        let document = self.libxml2.parse_document(xml)?;
        let stylesheet = self.parse_stylesheet_file(stylesheet_path)?;
        self.apply_to_string(&stylesheet, &document)
    }
}

impl Default for LibXsltWrapper {
    fn default() -> Self {
        Self::new()
    }
}
