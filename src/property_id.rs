/// Well-known MAPI property identifiers, named the way they appear in textual property tags.
macro_rules! property_ids {
    ($($name:ident = $value:literal),+ $(,)?) => {
        #[allow(non_upper_case_globals)]
        pub mod ids {
            $(pub const $name: u16 = $value;)+
        }

        /// Name of a well-known property id.
        pub fn property_id_name(id: u16) -> Option<&'static str> {
            match id {
                $($value => Some(stringify!($name)),)+
                _ => None,
            }
        }
    };
}

property_ids! {
    AcknowledgementMode = 0x0001,
    AlternateRecipientAllowed = 0x0002,
    AuthorizingUsers = 0x0003,
    AutoForwardComment = 0x0004,
    AutoForwarded = 0x0005,
    ContentConfidentialityAlgorithmId = 0x0006,
    ContentCorrelator = 0x0007,
    ContentIdentifier = 0x0008,
    ContentLength = 0x0009,
    ContentReturnRequested = 0x000A,
    ConversationKey = 0x000B,
    ConversionEits = 0x000C,
    ConversionWithLossProhibited = 0x000D,
    ConvertedEits = 0x000E,
    DeferredDeliveryTime = 0x000F,
    DeliverTime = 0x0010,
    DiscardReason = 0x0011,
    DisclosureOfRecipients = 0x0012,
    DlExpansionHistory = 0x0013,
    DlExpansionProhibited = 0x0014,
    ExpiryTime = 0x0015,
    ImplicitConversionProhibited = 0x0016,
    Importance = 0x0017,
    IpmId = 0x0018,
    LatestDeliveryTime = 0x0019,
    MessageClass = 0x001A,
    MessageDeliveryId = 0x001B,
    MessageSecurityLabel = 0x001E,
    ObsoletedIpms = 0x001F,
    OriginallyIntendedRecipientName = 0x0020,
    OriginalEits = 0x0021,
    OriginatorCertificate = 0x0022,
    OriginatorDeliveryReportRequested = 0x0023,
    OriginatorReturnAddress = 0x0024,
    ParentKey = 0x0025,
    Priority = 0x0026,
    OriginCheck = 0x0027,
    ProofOfSubmissionRequested = 0x0028,
    ReadReceiptRequested = 0x0029,
    ReceiptTime = 0x002A,
    RecipientReassignmentProhibited = 0x002B,
    RedirectionHistory = 0x002C,
    RelatedIpms = 0x002D,
    OriginalSensitivity = 0x002E,
    Languages = 0x002F,
    ReplyTime = 0x0030,
    ReportTag = 0x0031,
    ReportTime = 0x0032,
    ReturnedIpm = 0x0033,
    Security = 0x0034,
    IncompleteCopy = 0x0035,
    Sensitivity = 0x0036,
    Subject = 0x0037,
    SubjectIpm = 0x0038,
    ClientSubmitTime = 0x0039,
    ReportName = 0x003A,
    SentRepresentingSearchKey = 0x003B,
    X400ContentType = 0x003C,
    SubjectPrefix = 0x003D,
    NonReceiptReason = 0x003E,
    ReceivedByEntryId = 0x003F,
    ReceivedByName = 0x0040,
    SentRepresentingEntryId = 0x0041,
    SentRepresentingName = 0x0042,
    RcvdRepresentingEntryId = 0x0043,
    RcvdRepresentingName = 0x0044,
    ReportEntryId = 0x0045,
    ReadReceiptEntryId = 0x0046,
    MessageSubmissionId = 0x0047,
    ProviderSubmitTime = 0x0048,
    OriginalSubject = 0x0049,
    DiscVal = 0x004A,
    OrigMessageClass = 0x004B,
    OriginalAuthorEntryId = 0x004C,
    OriginalAuthorName = 0x004D,
    OriginalSubmitTime = 0x004E,
    ReplyRecipientEntries = 0x004F,
    ReplyRecipientNames = 0x0050,
    ReceivedBySearchKey = 0x0051,
    RcvdRepresentingSearchKey = 0x0052,
    ReadReceiptSearchKey = 0x0053,
    ReportSearchKey = 0x0054,
    OriginalDeliveryTime = 0x0055,
    OriginalAuthorSearchKey = 0x0056,
    MessageToMe = 0x0057,
    MessageCcMe = 0x0058,
    MessageRecipMe = 0x0059,
    StartDate = 0x0060,
    EndDate = 0x0061,
    SentRepresentingAddrtype = 0x0064,
    SentRepresentingEmailAddress = 0x0065,
    ConversationTopic = 0x0070,
    ConversationIndex = 0x0071,
    TransportMessageHeaders = 0x007D,
    RecipientType = 0x0C15,
    ReplyRequested = 0x0C17,
    SenderEntryId = 0x0C19,
    SenderName = 0x0C1A,
    SenderSearchKey = 0x0C1D,
    SenderAddrtype = 0x0C1E,
    SenderEmailAddress = 0x0C1F,
    DeleteAfterSubmit = 0x0E01,
    DisplayBcc = 0x0E02,
    DisplayCc = 0x0E03,
    DisplayTo = 0x0E04,
    MessageDeliveryTime = 0x0E06,
    MessageFlags = 0x0E07,
    MessageSize = 0x0E08,
    SentMailEntryId = 0x0E0A,
    HasAttach = 0x0E1B,
    NormalizedSubject = 0x0E1D,
    RtfInSync = 0x0E1F,
    AttachSize = 0x0E20,
    AttachNum = 0x0E21,
    Access = 0x0FF4,
    AccessLevel = 0x0FF7,
    MappingSignature = 0x0FF8,
    RecordKey = 0x0FF9,
    StoreRecordKey = 0x0FFA,
    StoreEntryId = 0x0FFB,
    ObjectType = 0x0FFE,
    EntryId = 0x0FFF,
    Body = 0x1000,
    RtfSyncBodyCrc = 0x1006,
    RtfSyncBodyCount = 0x1007,
    RtfSyncBodyTag = 0x1008,
    RtfCompressed = 0x1009,
    RtfSyncPrefixCount = 0x1010,
    RtfSyncTrailingCount = 0x1011,
    BodyHtml = 0x1013,
    InternetMessageId = 0x1035,
    InternetReferences = 0x1039,
    InReplyToId = 0x1042,
    IconIndex = 0x1080,
    DisplayName = 0x3001,
    Addrtype = 0x3002,
    EmailAddress = 0x3003,
    CreationTime = 0x3007,
    LastModificationTime = 0x3008,
    SearchKey = 0x300B,
    AttachDataBin = 0x3701,
    AttachExtension = 0x3703,
    AttachFilename = 0x3704,
    AttachMethod = 0x3705,
    AttachLongFilename = 0x3707,
    RenderingPosition = 0x370B,
    AttachMimeTag = 0x370E,
    AttachContentId = 0x3712,
    InternetCpid = 0x3FDE,
    MessageLocaleId = 0x3FF1,
    LastModifierName = 0x3FFA,
    MessageCodepage = 0x3FFD,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_names() {
        assert_eq!(property_id_name(ids::MessageClass), Some("MessageClass"));
        assert_eq!(property_id_name(0x0037), Some("Subject"));
        assert_eq!(property_id_name(0x7FFF), None);
    }
}
